//! Counterexample-guided inductive synthesis: pick one assignment at a time
//! via an incremental SAT encoding of the family, check it against a single
//! DTMC, and exclude every assignment sharing the blamed holes.

use crate::error::{Result, SynthesisError};
use crate::family::{Assignment, DesignSpace};
use crate::quotient::QuotientMdp;
use crate::specification::{
    check_specification, Comparison, FormulaKind, OptimizationDirection, Specification,
};
use crate::stats::{ScopedTimer, Statistic};

use super::{whole_model_conflict, Deadline, Synthesizer};

/// Counterexample-guided search over a single family using an incremental
/// SAT-based assignment enumerator.
///
/// Maximizing a reward objective is unsupported: this crate's conflict
/// generator excludes assignments *sound but not tight* (see
/// `super::whole_model_conflict`), which for a maximizing reward objective
/// would require re-deriving a lower bound from a DTMC that does not
/// improve on the current optimum — the same precondition
/// `SynthesizerCEGIS` asserts before running.
#[derive(Debug, Default)]
pub struct SynthesizerCegis;

impl Synthesizer for SynthesizerCegis {
    fn synthesize(
        &mut self,
        quotient: &QuotientMdp,
        family: DesignSpace,
        spec: &mut Specification,
        stats: &mut Statistic,
        deadline: Deadline,
    ) -> Result<Option<Assignment>> {
        reject_maximizing_reward(spec)?;

        let mut encoding = family.encode();
        let mut best = None;

        loop {
            if deadline.expired() {
                break;
            }
            let assignment = match encoding.pick_assignment(&family) {
                Some(assignment) => assignment,
                None => break,
            };
            stats.iterations_cegis += 1;

            let model = match quotient.build_chain(&assignment) {
                Some(model) => model,
                None => {
                    stats.on_reject();
                    let conflict = whole_model_conflict(quotient);
                    let pruned = encoding.exclude_assignment(&family, &assignment, &conflict);
                    stats.assignments_pruned += pruned.min(usize::MAX as u128) as usize;
                    continue;
                }
            };

            let result = {
                let _timer = ScopedTimer::new(&mut stats.model_checking_time);
                check_specification(&model, spec, None, false)?
            };

            if !result.sat() {
                stats.on_reject();
                let conflict = whole_model_conflict(quotient);
                let pruned = encoding.exclude_assignment(&family, &assignment, &conflict);
                stats.assignments_pruned += pruned.min(usize::MAX as u128) as usize;
                continue;
            }
            stats.on_accept();

            match &result.optimality_result {
                None => return Ok(Some(assignment)),
                Some(optimality) => {
                    let improved = spec.update_optimum(optimality.property_result.primary.value_at_initial);
                    if improved {
                        best = Some(assignment.clone());
                    }
                    // whether or not this assignment improved the optimum,
                    // it has been checked; exclude it so the next pick finds
                    // a genuinely different assignment.
                    let conflict = whole_model_conflict(quotient);
                    encoding.exclude_assignment(&family, &assignment, &conflict);
                }
            }
        }

        Ok(best)
    }
}

fn reject_maximizing_reward(spec: &Specification) -> Result<()> {
    if let Some(optimality) = &spec.optimality {
        let is_maximizing_reward = optimality.direction == OptimizationDirection::Maximize
            && matches!(optimality.formula.kind, FormulaKind::Reward { .. });
        if is_maximizing_reward {
            return Err(SynthesisError::unsupported_specification(
                "CEGIS cannot synthesize a maximizing reward objective",
            ));
        }
    }
    // An `AtMost` reward constraint needs a maximizing scheduler pass to
    // prove every family member's expected reward stays under the bound
    // (see `Comparison::primary_direction`), which is the same unbounded-
    // reward case the optimality check above refuses.
    let has_maximizing_reward_constraint = spec.constraints.iter().any(|constraint| {
        matches!(constraint.comparison, Comparison::AtMost(_))
            && matches!(constraint.formula.kind, FormulaKind::Reward { .. })
    });
    if has_maximizing_reward_constraint {
        return Err(SynthesisError::unsupported_specification(
            "CEGIS cannot synthesize a constraint requiring a maximizing reward bound",
        ));
    }
    Ok(())
}
