//! Baseline exhaustive enumeration: check every assignment in the family
//! one by one.

use crate::error::Result;
use crate::family::{Assignment, DesignSpace};
use crate::quotient::QuotientMdp;
use crate::specification::check_specification;
use crate::specification::Specification;
use crate::stats::{ScopedTimer, Statistic};

use super::{Deadline, Synthesizer};

/// Exhaustively checks every assignment of the family against the
/// specification, keeping the best one found.
///
/// With no optimality objective this returns as soon as the first
/// satisfying assignment is found; with one, it keeps searching (subject to
/// `deadline`) for the best value, only stopping early when there is
/// nothing left to improve.
#[derive(Debug, Default)]
pub struct OneByOne;

impl Synthesizer for OneByOne {
    fn synthesize(
        &mut self,
        quotient: &QuotientMdp,
        family: DesignSpace,
        spec: &mut Specification,
        stats: &mut Statistic,
        deadline: Deadline,
    ) -> Result<Option<Assignment>> {
        let mut best = None;
        for assignment in family.all_combinations() {
            if deadline.expired() {
                break;
            }
            stats.iterations_cegis += 1;

            let model = match quotient.build_chain(&assignment) {
                Some(model) => model,
                None => {
                    stats.on_reject();
                    continue;
                }
            };

            let result = {
                let _timer = ScopedTimer::new(&mut stats.model_checking_time);
                check_specification(&model, spec, None, false)?
            };

            if !result.sat() {
                stats.on_reject();
                continue;
            }
            stats.on_accept();

            match &result.optimality_result {
                None => return Ok(Some(assignment)),
                Some(optimality) => {
                    if spec.update_optimum(optimality.property_result.primary.value_at_initial) {
                        stats.update_best_value(
                            optimality.property_result.primary.value_at_initial,
                            matches!(
                                spec.optimality.as_ref().unwrap().direction,
                                crate::specification::OptimizationDirection::Maximize
                            ),
                        );
                        best = Some(assignment);
                    }
                }
            }
        }
        Ok(best)
    }
}
