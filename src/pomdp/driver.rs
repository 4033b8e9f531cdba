//! The POMDP memory-refinement driver: starts every observation at memory
//! size 1 and injects memory at whichever observation's hole scores
//! highest, rebuilding a symmetry-broken restricted design space after each
//! injection, until the specification is satisfied or no hole can still be
//! grown. Only the iterative memory-growth strategy is implemented; batch
//! and expected-visit-weighted allocation strategies are out of scope.

use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::family::{Assignment, DesignSpace};
use crate::quotient::Coloring;
use crate::sketch::Sketch;
use crate::specification::check_specification;
use crate::stats::Statistic;
use crate::synthesizer::{Deadline, Synthesizer};
use crate::synthesizer::hybrid::SynthesizerHybrid;

use super::fsc::{ActionEntry, Fsc};
use super::hole_tree::HoleTree;

/// Memory-injection rounds before giving up. Bounds iterations so a
/// misconfigured sketch cannot loop forever even with `Deadline::none()`.
const MAX_ITERATIONS: usize = 20;

/// One (action hole, memory/update hole) pair per memory node of one
/// observation, keyed by observation id then ordered by node index.
///
/// The holes of a POMDP sketch are produced by an external memory-unfolding
/// tool upstream of this crate (see `SPEC_FULL.md` §4.8's preamble), so this
/// driver recovers the (observation, node) a hole belongs to from its name
/// rather than constructing the unfolding itself: an action hole for node
/// `n` of observation `z` is named `act_{z}_{n}`, its paired memory/update
/// hole `mem_{z}_{n}`.
type ObservationGroups = BTreeMap<usize, Vec<(usize, usize)>>;

fn parse_node_hole_name(name: &str, prefix: &str) -> Option<(usize, usize)> {
    let rest = name.strip_prefix(prefix)?;
    let (obs_str, node_str) = rest.split_once('_')?;
    Some((obs_str.parse().ok()?, node_str.parse().ok()?))
}

fn observation_groups(design_space: &DesignSpace) -> ObservationGroups {
    let mut by_node: BTreeMap<usize, BTreeMap<usize, (Option<usize>, Option<usize>)>> = BTreeMap::new();
    for (index, hole) in design_space.holes().iter().enumerate() {
        if let Some((obs, node)) = parse_node_hole_name(hole.name(), "act_") {
            by_node.entry(obs).or_default().entry(node).or_default().0 = Some(index);
        } else if let Some((obs, node)) = parse_node_hole_name(hole.name(), "mem_") {
            by_node.entry(obs).or_default().entry(node).or_default().1 = Some(index);
        }
    }
    by_node
        .into_iter()
        .filter_map(|(obs, nodes)| {
            let pairs: Option<Vec<(usize, usize)>> =
                nodes.into_values().map(|(act, mem)| act.zip(mem)).collect();
            pairs.map(|pairs| (obs, pairs))
        })
        .collect()
}

/// Per-hole inconsistency score: the number of scheduler entries whose
/// enabling requirement references that hole.
fn hole_scores(coloring: &Coloring, scheduler: &[usize], num_holes: usize) -> Vec<f64> {
    let mut scores = vec![0.0; num_holes];
    for &choice in scheduler {
        for &(hole, _) in coloring.requirements(choice) {
            scores[hole] += 1.0;
        }
    }
    scores
}

/// Builds the restricted design space for the current memory trees: a node
/// not yet admitted by its observation's tree has both its action and
/// memory hole fixed to their first option, so only live nodes contribute
/// nondeterminism to the quotient.
fn restricted_family(
    design_space: &DesignSpace,
    groups: &ObservationGroups,
    trees: &BTreeMap<usize, HoleTree>,
) -> DesignSpace {
    let mut family = design_space.clone();
    for (obs, nodes) in groups {
        // memory size starts at 1 for every observation: with no tree yet
        // recorded, only node 0 is live.
        let live: Vec<usize> = trees
            .get(obs)
            .map(|tree| tree.live_options().to_vec())
            .unwrap_or_else(|| vec![0]);
        for (node, &(act_index, mem_index)) in nodes.iter().enumerate() {
            if !live.contains(&node) {
                let act_default = design_space.hole(act_index).options()[0];
                let mem_default = design_space.hole(mem_index).options()[0];
                family = family.subholes(act_index, vec![act_default]);
                family = family.subholes(mem_index, vec![mem_default]);
            }
        }
    }
    family
}

/// Picks the highest-scoring hole (filtered to within 1% of the maximum,
/// per `SPEC_FULL.md` §4.8 step d), then grows the first growable
/// observation it maps to. Returns `false` if no hole both scores above the
/// threshold and maps to an observation with an unused memory node left.
fn inject_memory(
    scores: &[f64],
    hole_to_observation: &HashMap<usize, usize>,
    groups: &ObservationGroups,
    trees: &mut BTreeMap<usize, HoleTree>,
) -> bool {
    let max_score = scores.iter().cloned().fold(0.0_f64, f64::max);
    if max_score <= 0.0 {
        return false;
    }
    let threshold = 0.01 * max_score;
    let mut candidates: Vec<(usize, f64)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, score)| score >= threshold)
        .collect();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).expect("scores are finite"));

    for (hole, _) in candidates {
        let Some(&obs) = hole_to_observation.get(&hole) else {
            continue;
        };
        let Some(nodes) = groups.get(&obs) else {
            continue;
        };
        let tree = trees.entry(obs).or_insert_with(|| HoleTree::new(vec![0]));
        let live = tree.live_options().to_vec();
        let Some(&next_node) = (0..nodes.len()).find(|n| !live.contains(n)).as_ref() else {
            continue;
        };
        let mut preferred = live.clone();
        preferred.push(next_node);
        preferred.sort_unstable();
        let rest: Vec<usize> = (0..nodes.len()).filter(|n| !preferred.contains(n)).collect();
        let (grown, _) = tree.split(preferred, rest);
        tree.descend(grown);
        return true;
    }
    false
}

fn build_fsc(assignment: &Assignment, groups: &ObservationGroups) -> Result<Fsc> {
    let num_observations = groups.keys().max().map_or(1, |max| max + 1);
    let num_nodes = groups.values().map(Vec::len).max().unwrap_or(1);

    let mut action_function = vec![vec![ActionEntry::Deterministic(0); num_observations]; num_nodes];
    let mut update_function = vec![vec![0usize; num_observations]; num_nodes];

    for (&obs, nodes) in groups {
        for (node_row, row_action) in action_function.iter_mut().enumerate().take(num_nodes) {
            let clamped = node_row.min(nodes.len() - 1);
            let (act_index, mem_index) = nodes[clamped];
            row_action[obs] = ActionEntry::Deterministic(assignment.option(act_index));
            update_function[node_row][obs] = assignment.option(mem_index).min(num_nodes - 1);
        }
    }

    Fsc::new(num_nodes, num_observations, action_function, update_function)
}

/// Runs the iterative memory-refinement strategy over `sketch`, returning
/// the synthesized controller once the specification is satisfied, or
/// `None` if every growable observation is exhausted (or `deadline`
/// elapses) first. Neither outcome is an error (see `SPEC_FULL.md` §7).
pub struct SynthesizerPomdp;

impl SynthesizerPomdp {
    pub fn run(&self, sketch: &Sketch, deadline: Deadline) -> Result<Option<Fsc>> {
        let groups = observation_groups(&sketch.design_space);
        let mut hole_to_observation = HashMap::new();
        for (&obs, nodes) in &groups {
            for &(act_index, mem_index) in nodes {
                hole_to_observation.insert(act_index, obs);
                hole_to_observation.insert(mem_index, obs);
            }
        }

        let mut trees: BTreeMap<usize, HoleTree> = BTreeMap::new();
        let mut spec = sketch.specification.clone();
        let mut stats = Statistic::new();

        for _ in 0..MAX_ITERATIONS {
            if deadline.expired() {
                break;
            }

            let family = restricted_family(&sketch.design_space, &groups, &trees);
            let mut hybrid = SynthesizerHybrid::default();
            if let Some(assignment) =
                hybrid.synthesize(&sketch.quotient, family.clone(), &mut spec, &mut stats, deadline)?
            {
                return Ok(Some(build_fsc(&assignment, &groups)?));
            }

            let Some(model) = sketch.quotient.build(&family) else {
                break;
            };
            let mut probe_spec = sketch.specification.clone();
            let result = check_specification(&model, &mut probe_spec, None, false)?;
            // `undecided_result` only covers constraints the abstraction hasn't
            // yet decided either way; a family can be conclusively violated at
            // the current memory size and still be worth growing (that's the
            // whole point of injection), so fall back to whichever constraint
            // was actually evaluated to recover a scheduler to score holes
            // against. Only a result with nothing evaluated at all (shouldn't
            // happen since this probe never short-circuits) stops the loop.
            let Some(scheduler) = result
                .undecided_result()
                .or_else(|| result.constraints_result.results.iter().flatten().next())
                .map(|r| r.selection_result().scheduler.clone())
            else {
                break;
            };

            let scores = hole_scores(&sketch.quotient.coloring, &scheduler, sketch.design_space.num_holes());
            if !inject_memory(&scores, &hole_to_observation, &groups, &mut trees) {
                break;
            }
        }

        Ok(None)
    }
}
