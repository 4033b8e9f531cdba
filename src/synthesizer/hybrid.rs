//! Hybrid search: alternates abstraction-refinement splitting with
//! bounded CEGIS batches on the same family, arbitrated by a
//! [`StageController`] that favors whichever stage has recently pruned more
//! of the family per second of work.

use std::time::Duration;

use crate::error::Result;
use crate::family::{Assignment, DesignSpace};
use crate::quotient::QuotientMdp;
use crate::specification::{check_specification, Specification};
use crate::stats::{ScopedTimer, Statistic, Timer};

use super::{whole_model_conflict, Deadline, Synthesizer};

/// The number of assignments a CEGIS batch checks per family before
/// yielding back to abstraction-refinement splitting.
const CEGIS_BATCH_SIZE: usize = 8;

/// Arbitrates between an AR round and a CEGIS batch based on which has
/// pruned more assignments per second of wall-clock time so far.
///
/// Mirrors `StageControl`'s running efficiency estimate, simplified to a
/// single scalar (prunes per second) per stage instead of the original's
/// per-family timeout adaptation.
#[derive(Debug, Default)]
pub struct StageController {
    ar_time: Timer,
    ar_prunes: u128,
    cegis_time: Timer,
    cegis_prunes: u128,
}

impl StageController {
    fn efficiency(time: &Timer, prunes: u128) -> f64 {
        let seconds = time.elapsed().as_secs_f64();
        if seconds < 1e-9 {
            f64::INFINITY
        } else {
            prunes as f64 / seconds
        }
    }

    /// Whether the next round should run a CEGIS batch rather than an AR
    /// split. Defaults to AR (`false`) until both stages have run once.
    pub fn should_run_cegis(&self) -> bool {
        if self.ar_time.elapsed() < Duration::from_micros(1) {
            return false;
        }
        if self.cegis_time.elapsed() < Duration::from_micros(1) {
            return true;
        }
        Self::efficiency(&self.cegis_time, self.cegis_prunes.max(1))
            > Self::efficiency(&self.ar_time, self.ar_prunes.max(1))
    }
}

/// Hybrid AR/CEGIS search over a single family tree.
#[derive(Debug, Default)]
pub struct SynthesizerHybrid {
    controller: StageController,
}

impl Synthesizer for SynthesizerHybrid {
    fn synthesize(
        &mut self,
        quotient: &QuotientMdp,
        family: DesignSpace,
        spec: &mut Specification,
        stats: &mut Statistic,
        deadline: Deadline,
    ) -> Result<Option<Assignment>> {
        let mut stack = vec![family];
        let mut best = None;

        while let Some(family) = stack.pop() {
            if deadline.expired() {
                break;
            }
            stats.iterations_ar += 1;

            let mut timer = Timer::new();
            timer.start();
            let model = match quotient.build(&family) {
                Some(model) => model,
                None => {
                    stats.on_reject();
                    timer.stop();
                    self.controller.ar_time.add(timer.elapsed());
                    self.controller.ar_prunes += 1;
                    continue;
                }
            };

            let result = {
                let _timer = ScopedTimer::new(&mut stats.model_checking_time);
                check_specification(&model, spec, None, true)?
            };
            timer.stop();
            self.controller.ar_time.add(timer.elapsed());

            if result.unsat() {
                stats.on_reject();
                self.controller.ar_prunes += 1;
                continue;
            }
            if let Some(optimality) = &result.optimality_result {
                if !optimality.can_improve {
                    stats.on_reject();
                    self.controller.ar_prunes += 1;
                    continue;
                }
            } else if result.sat() {
                stats.on_accept();
                self.controller.ar_prunes += 1;
                return Ok(Some(family.pick_any()));
            }
            if let Some(assignment) = family.clone().into_assignment() {
                stats.on_accept();
                if let Some(optimality) = &result.optimality_result {
                    if spec.update_optimum(optimality.property_result.primary.value_at_initial) {
                        best = Some(assignment);
                    }
                } else if result.sat() {
                    return Ok(Some(assignment));
                }
                continue;
            }

            // undecided, non-singleton family: try a bounded CEGIS batch
            // first if it has recently been the more efficient stage.
            if self.controller.should_run_cegis() {
                let mut cegis_timer = Timer::new();
                cegis_timer.start();
                let mut encoding = family.encode();
                let mut resolved = false;
                for _ in 0..CEGIS_BATCH_SIZE {
                    let assignment = match encoding.pick_assignment(&family) {
                        Some(assignment) => assignment,
                        None => {
                            // the whole family was exhausted by the batch
                            resolved = true;
                            break;
                        }
                    };
                    stats.iterations_cegis += 1;
                    let chain = match quotient.build_chain(&assignment) {
                        Some(chain) => chain,
                        None => {
                            self.controller.cegis_prunes += 1;
                            let conflict = whole_model_conflict(quotient);
                            encoding.exclude_assignment(&family, &assignment, &conflict);
                            continue;
                        }
                    };
                    let chain_result = {
                        let _timer = ScopedTimer::new(&mut stats.model_checking_time);
                        check_specification(&chain, spec, None, false)?
                    };
                    if !chain_result.sat() {
                        stats.on_reject();
                        self.controller.cegis_prunes += 1;
                        let conflict = whole_model_conflict(quotient);
                        encoding.exclude_assignment(&family, &assignment, &conflict);
                        continue;
                    }
                    stats.on_accept();
                    match &chain_result.optimality_result {
                        None => {
                            cegis_timer.stop();
                            self.controller.cegis_time.add(cegis_timer.elapsed());
                            return Ok(Some(assignment));
                        }
                        Some(optimality) => {
                            if spec.update_optimum(optimality.property_result.primary.value_at_initial) {
                                best = Some(assignment.clone());
                            }
                            let conflict = whole_model_conflict(quotient);
                            encoding.exclude_assignment(&family, &assignment, &conflict);
                        }
                    }
                }
                cegis_timer.stop();
                self.controller.cegis_time.add(cegis_timer.elapsed());
                if resolved {
                    continue;
                }
            }

            let scheduler = result
                .undecided_result()
                .map(|r| r.selection_result().scheduler.clone())
                .unwrap_or_default();
            stack.extend(quotient.split(&family, &scheduler));
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

    /// Same two-hole fixture as `ar`'s and `cegis`'s tests: only `(1, 1)`
    /// reaches the goal, so Hybrid's AR/CEGIS interleaving must still land
    /// on it regardless of which stage the controller favors first.
    fn two_hole_quotient() -> (QuotientMdp, DesignSpace) {
        let mut goal = FixedBitSet::with_capacity(3);
        goal.set(1, true);
        let mut labels = HashMap::new();
        labels.insert("goal".to_string(), goal);

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
        let row_starts = vec![0, 4, 5, 6];

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
    fn test_hybrid_finds_the_only_satisfying_assignment() {
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
        let result = SynthesizerHybrid::default()
            .synthesize(&quotient, design_space, &mut spec, &mut stats, Deadline::none())
            .unwrap();
        let assignment = result.expect("a satisfying assignment exists");
        assert_eq!(assignment.option(0), 1);
        assert_eq!(assignment.option(1), 1);
    }

    #[test]
    fn test_hybrid_reports_infeasible_when_no_assignment_satisfies() {
        let (quotient, design_space) = two_hole_quotient();
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
        let result = SynthesizerHybrid::default()
            .synthesize(&quotient, design_space, &mut spec, &mut stats, Deadline::none())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_stage_controller_defaults_to_ar_then_switches_on_efficiency() {
        let controller = StageController::default();
        assert!(!controller.should_run_cegis());
    }
}
