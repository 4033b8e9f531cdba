//! Abstraction-refinement: explore the family tree depth-first, model
//! checking the quotient MDP of each family and only splitting when the
//! quotient result is undecided.

use crate::error::Result;
use crate::family::{Assignment, DesignSpace};
use crate::quotient::QuotientMdp;
use crate::specification::{check_specification, OptimizationDirection, Specification};
use crate::stats::{ScopedTimer, Statistic};

use super::{Deadline, Synthesizer};

/// A sub-family still on the worklist, together with the indices of
/// constraints its parent left undecided (`None` at the root, meaning
/// every constraint still needs checking).
///
/// A constraint absent from this set was already proven satisfied for
/// every member of an ancestor family, so it is never re-evaluated on the
/// way down — this is the "property_indices" propagation of `SPEC_FULL.md`
/// §9.
type Work = (DesignSpace, Option<Vec<usize>>);

/// Explores a family tree by quotient-MDP abstraction, splitting undecided
/// families and pruning accepted/rejected ones.
#[derive(Debug, Default)]
pub struct SynthesizerAr;

impl Synthesizer for SynthesizerAr {
    fn synthesize(
        &mut self,
        quotient: &QuotientMdp,
        family: DesignSpace,
        spec: &mut Specification,
        stats: &mut Statistic,
        deadline: Deadline,
    ) -> Result<Option<Assignment>> {
        let mut stack: Vec<Work> = vec![(family, None)];
        let mut best = None;

        while let Some((family, property_indices)) = stack.pop() {
            if deadline.expired() {
                break;
            }
            stats.iterations_ar += 1;

            let model = match quotient.build(&family) {
                Some(model) => model,
                None => {
                    stats.on_reject();
                    continue;
                }
            };

            let result = {
                let _timer = ScopedTimer::new(&mut stats.model_checking_time);
                check_specification(&model, spec, property_indices.as_deref(), true)?
            };

            if result.unsat() {
                stats.on_reject();
                continue;
            }

            if let Some(optimality) = &result.optimality_result {
                if !optimality.can_improve {
                    stats.on_reject();
                    continue;
                }
            } else if result.sat() {
                // Whole sub-family resolved in one shot: every member
                // satisfies every constraint and there is no optimality
                // objective left to narrow down, so any member is a witness.
                stats.on_accept();
                return Ok(Some(family.pick_any()));
            }

            if let Some(assignment) = family.clone().into_assignment() {
                stats.on_accept();
                if let Some(optimality) = &result.optimality_result {
                    let value = optimality.property_result.primary.value_at_initial;
                    if spec.update_optimum(value) {
                        stats.update_best_value(
                            value,
                            spec.optimality.as_ref().unwrap().direction == OptimizationDirection::Maximize,
                        );
                        best = Some(assignment);
                    }
                } else if result.sat() {
                    return Ok(Some(assignment));
                }
                continue;
            }

            let scheduler = result
                .undecided_result()
                .map(|r| r.selection_result().scheduler.clone())
                .unwrap_or_default();
            let undecided = result.constraints_result.undecided_indices();
            stack.extend(
                quotient
                    .split(&family, &scheduler)
                    .into_iter()
                    .map(|child| (child, Some(undecided.clone()))),
            );
        }

        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{DesignSpace, Hole};
    use crate::quotient::{Coloring, QuotientChoice, QuotientMdp};
    use crate::specification::{Comparison, ConstraintProperty, Formula, FormulaKind};
    use fixedbitset::FixedBitSet;
    use std::collections::HashMap;

    /// Two holes, each selecting one of two direct self-looping "exits":
    /// only the `(1, 1)` combination reaches the goal. A single
    /// undecided-property-propagating AR pass must still discover and
    /// return it without ever mistaking a half-resolved sub-family for a
    /// witness.
    fn two_hole_quotient() -> (QuotientMdp, DesignSpace) {
        let mut goal = FixedBitSet::with_capacity(3);
        goal.set(1, true);
        let mut labels = HashMap::new();
        labels.insert("goal".to_string(), goal);

        // state 0: choices colored by (hole0, option) x (hole1, option)
        // combinations; only hole0=1 & hole1=1 leads to state 1 (goal).
        let mut choices = Vec::new();
        let mut requirements = Vec::new();
        for h0 in 0..2 {
            for h1 in 0..2 {
                let target = if h0 == 1 && h1 == 1 { 1 } else { 2 };
                choices.push(QuotientChoice {
                    successors: vec![(target, 1.0)],
                    rewards: HashMap::new(),
                });
                requirements.push(vec![(0, h0), (1, h1)]);
            }
        }
        let row_starts = vec![0, 4, 4, 4];
        choices.push(QuotientChoice {
            successors: vec![(1, 1.0)],
            rewards: HashMap::new(),
        });
        requirements.push(Vec::new());
        choices.push(QuotientChoice {
            successors: vec![(2, 1.0)],
            rewards: HashMap::new(),
        });
        requirements.push(Vec::new());
        let mut row_starts = row_starts;
        *row_starts.last_mut().unwrap() = 4;
        row_starts[2] = 5;
        row_starts[3] = 6;

        let quotient = QuotientMdp {
            num_states: 3,
            row_starts,
            choices,
            labels,
            initial_state: 0,
            coloring: Coloring::new(requirements),
            num_holes: 2,
        };
        let design_space = DesignSpace::new(vec![
            Hole::new("h0".to_string(), vec!["a".to_string(), "b".to_string()]),
            Hole::new("h1".to_string(), vec!["a".to_string(), "b".to_string()]),
        ]);
        (quotient, design_space)
    }

    #[test]
    fn test_ar_finds_the_only_satisfying_assignment() {
        let (quotient, design_space) = two_hole_quotient();
        let mut spec = Specification::new(
            vec![ConstraintProperty {
                formula: Formula {
                    kind: FormulaKind::Reachability {
                        target_label: "goal".into(),
                    },
                },
                comparison: Comparison::AtLeast(1.0),
            }],
            None,
        );
        let mut stats = Statistic::new();
        let result = SynthesizerAr
            .synthesize(&quotient, design_space, &mut spec, &mut stats, Deadline::none())
            .unwrap();
        let assignment = result.expect("a satisfying assignment exists");
        assert_eq!(assignment.option(0), 1);
        assert_eq!(assignment.option(1), 1);
    }

    #[test]
    fn test_ar_reports_infeasible_when_no_assignment_satisfies() {
        let (quotient, design_space) = two_hole_quotient();
        // demand probability 1 of reaching a state nothing reaches: no
        // assignment can ever satisfy this.
        let mut spec = Specification::new(
            vec![ConstraintProperty {
                formula: Formula {
                    kind: FormulaKind::Reachability {
                        target_label: "unreachable".into(),
                    },
                },
                comparison: Comparison::AtLeast(1.0),
            }],
            None,
        );
        let mut labels = HashMap::new();
        labels.insert("unreachable".to_string(), FixedBitSet::with_capacity(3));
        let quotient = QuotientMdp { labels, ..quotient };
        let mut stats = Statistic::new();
        let result = SynthesizerAr
            .synthesize(&quotient, design_space, &mut spec, &mut stats, Deadline::none())
            .unwrap();
        assert!(result.is_none());
    }
}
