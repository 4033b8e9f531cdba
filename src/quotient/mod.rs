//! The quotient MDP: the union, over every hole assignment, of all
//! reachable behavior, together with the operations ([`QuotientMdp::build`],
//! [`QuotientMdp::build_chain`], [`QuotientMdp::split`]) that let a
//! synthesizer restrict it to one family or one assignment at a time.

pub mod coloring;
pub mod model;

use std::collections::{HashMap, VecDeque};

use fixedbitset::FixedBitSet;

pub use coloring::Coloring;
pub use model::{Choice, ExplicitDtmc, ExplicitMdp};

use crate::family::{Assignment, DesignSpace};

/// One (state, successor distribution, reward, coloring requirement) row of
/// the quotient before any family restricts it.
#[derive(Debug, Clone)]
pub struct QuotientChoice {
    pub successors: Vec<(usize, f64)>,
    pub rewards: HashMap<String, f64>,
}

/// The full quotient MDP built once from a sketch: every state reachable
/// under *some* hole assignment, and every choice available under *some*
/// assignment, tagged with the hole-option conjunction that enables it.
#[derive(Debug, Clone)]
pub struct QuotientMdp {
    pub num_states: usize,
    pub row_starts: Vec<usize>,
    pub choices: Vec<QuotientChoice>,
    pub labels: HashMap<String, FixedBitSet>,
    pub initial_state: usize,
    pub coloring: Coloring,
    pub num_holes: usize,
}

impl QuotientMdp {
    pub fn choices_of(&self, state: usize) -> &[QuotientChoice] {
        &self.choices[self.row_starts[state]..self.row_starts[state + 1]]
    }

    /// Restricts the quotient to the choices compatible with `family`, and
    /// to the subset of states reachable from the initial state using only
    /// those choices.
    ///
    /// Runs a forward reachability pass from the initial state over only
    /// the choices compatible with `family`. Returns `None` if no
    /// compatible choice is reachable from the initial state (the family
    /// denotes an empty set of models).
    pub fn build(&self, family: &DesignSpace) -> Option<ExplicitMdp> {
        self.build_restricted(|choice| self.coloring.compatible(choice, family))
    }

    /// The specialization of [`QuotientMdp::build`] to a single concrete
    /// assignment. The result has exactly one surviving choice per
    /// reachable state whenever the sketch's only nondeterminism is
    /// hole-driven (the invariant this crate's sketch reader maintains).
    pub fn build_chain(&self, assignment: &Assignment) -> Option<ExplicitDtmc> {
        self.build(assignment.as_design_space())
    }

    fn build_restricted(&self, compatible: impl Fn(usize) -> bool) -> Option<ExplicitMdp> {
        let mut quotient_to_model = HashMap::new();
        let mut model_to_quotient = Vec::new();
        let mut queue = VecDeque::new();

        quotient_to_model.insert(self.initial_state, 0usize);
        model_to_quotient.push(self.initial_state);
        queue.push_back(self.initial_state);

        let mut row_starts = vec![0usize];
        let mut choices = Vec::new();

        // states are assigned model indices in BFS order as they are first
        // discovered, so a second pass can resolve successor indices once
        // every reachable quotient state has been numbered.
        let mut pending: Vec<Vec<(usize, &QuotientChoice)>> = Vec::new();

        while let Some(quotient_state) = queue.pop_front() {
            let mut enabled = Vec::new();
            for (offset, choice) in self.choices_of(quotient_state).iter().enumerate() {
                let choice_index = self.row_starts[quotient_state] + offset;
                if !compatible(choice_index) {
                    continue;
                }
                for &(successor, _) in &choice.successors {
                    quotient_to_model.entry(successor).or_insert_with(|| {
                        model_to_quotient.push(successor);
                        queue.push_back(successor);
                        model_to_quotient.len() - 1
                    });
                }
                enabled.push((choice_index, choice));
            }
            pending.push(enabled);
        }

        if pending[0].is_empty() {
            return None;
        }
        let num_states = model_to_quotient.len();

        for enabled in &pending {
            for &(choice_index, choice) in enabled {
                let successors = choice
                    .successors
                    .iter()
                    .map(|&(s, p)| (quotient_to_model[&s], p))
                    .collect();
                choices.push(Choice {
                    successors,
                    rewards: choice.rewards.clone(),
                    quotient_choice: choice_index,
                });
            }
            row_starts.push(choices.len());
        }

        let labels = self
            .labels
            .iter()
            .map(|(name, quotient_set)| {
                let mut set = FixedBitSet::with_capacity(num_states);
                for (model_state, &quotient_state) in model_to_quotient.iter().enumerate() {
                    if quotient_set.contains(quotient_state) {
                        set.insert(model_state);
                    }
                }
                (name.clone(), set)
            })
            .collect();

        Some(ExplicitMdp {
            num_states,
            row_starts,
            choices,
            labels,
            initial_state: 0,
            quotient_state_map: model_to_quotient,
        })
    }

    /// Splits `family` into two (or more) sub-families along the hole that
    /// `scheduler` (one quotient choice per model state, as produced in a
    /// [`crate::specification::DirectionalResult`]) disagrees on the most.
    ///
    /// The inconsistency score for a hole is approximated as the number of
    /// scheduler entries whose enabling requirement references that hole —
    /// a coarse, uniform-weight stand-in for "variance weighted by expected
    /// visits", since this crate's explicit model has no stationary
    /// distribution computation (see `DESIGN.md`). Ties are broken by the
    /// lowest hole index.
    ///
    /// Every hole is split "preferred options (the ones the scheduler
    /// picked) vs the rest"; when the scheduler happened to use every
    /// currently available option (so "the rest" would be empty), the
    /// preferred set itself is split in half to guarantee progress.
    pub fn split(&self, family: &DesignSpace, scheduler: &[usize]) -> Vec<DesignSpace> {
        let selection = self.coloring.hole_selection(scheduler, family.num_holes());

        let mut best_hole = None;
        let mut best_score = 0usize;
        for (hole, options) in selection.iter().enumerate() {
            if options.len() <= 1 || family.hole(hole).size() <= 1 {
                continue;
            }
            let score = scheduler
                .iter()
                .filter(|&&choice| self.coloring.requirements(choice).iter().any(|&(h, _)| h == hole))
                .count();
            if score > best_score || best_hole.is_none() {
                best_score = score;
                best_hole = Some(hole);
            }
        }

        let splitter = match best_hole {
            Some(hole) => hole,
            None => {
                // no hole is inconsistent under this scheduler (should not
                // normally be reached since the caller only calls split on
                // an undecided, non-singleton family); fall back to
                // splitting the widest hole in half.
                (0..family.num_holes())
                    .max_by_key(|&h| family.hole(h).size())
                    .expect("family has at least one hole")
            }
        };

        let current_options = family.hole(splitter).options().to_vec();
        let preferred: Vec<usize> = current_options
            .iter()
            .copied()
            .filter(|o| selection[splitter].contains(o))
            .collect();

        let (first, second) = if preferred.is_empty() || preferred.len() == current_options.len() {
            let mid = current_options.len() / 2;
            (current_options[..mid].to_vec(), current_options[mid..].to_vec())
        } else {
            let rest: Vec<usize> = current_options
                .iter()
                .copied()
                .filter(|o| !selection[splitter].contains(o))
                .collect();
            (preferred, rest)
        };

        vec![
            family.subholes(splitter, first),
            family.subholes(splitter, second),
        ]
    }

    /// The holes whose option still affects at least one choice of the
    /// quotient, i.e. the holes relevant to synthesis. A hole that was
    /// declared but never referenced by any command has no effect and is
    /// never returned.
    pub fn quotient_relevant_holes(&self) -> Vec<usize> {
        let mut relevant = vec![false; self.num_holes];
        for choice_index in 0..self.choices.len() {
            for &(hole, _) in self.coloring.requirements(choice_index) {
                relevant[hole] = true;
            }
        }
        relevant
            .into_iter()
            .enumerate()
            .filter_map(|(hole, is_relevant)| is_relevant.then_some(hole))
            .collect()
    }
}
