//! The four search strategies over a family of Markov models: exhaustive
//! enumeration, abstraction-refinement, counterexample-guided search, and
//! the hybrid combination of the two driven by a [`hybrid::StageController`].
//!
//! Rather than a class hierarchy built on multiple inheritance, this crate
//! uses composition: a single [`Synthesizer`] trait implemented by four
//! independent structs,
//! each owning exactly the state (and, for Hybrid, the other strategies) it
//! needs.

pub mod ar;
pub mod cegis;
pub mod hybrid;
pub mod one_by_one;

use std::time::{Duration, Instant};

use crate::error::Result;
use crate::family::{Assignment, DesignSpace};
use crate::quotient::QuotientMdp;
use crate::specification::Specification;
use crate::stats::Statistic;

/// A cooperative wall-clock budget checked between outer iterations of a
/// synthesizer's search loop, rather than preempting it mid model-check
/// call. `None` means no deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(duration: Duration) -> Self {
        Self(Some(Instant::now() + duration))
    }

    pub fn expired(&self) -> bool {
        matches!(self.0, Some(instant) if Instant::now() >= instant)
    }
}

/// A strategy for finding an assignment from `family` that satisfies
/// `spec`, optimizing the objective it carries if any.
///
/// Returns the best assignment found before the family was exhausted or a
/// deadline elapsed — timeout and family exhaustion are both normal
/// termination paths, not errors (see `SPEC_FULL.md` §7).
pub trait Synthesizer {
    fn synthesize(
        &mut self,
        quotient: &QuotientMdp,
        family: DesignSpace,
        spec: &mut Specification,
        stats: &mut Statistic,
        deadline: Deadline,
    ) -> Result<Option<Assignment>>;
}

/// The holes a CEGIS-style conflict is blamed on when no finer-grained
/// counterexample minimization is available.
///
/// A full counterexample-minimization engine (MaxSAT-based unsat-core
/// extraction over the failing DTMC) is an out-of-scope external
/// collaborator; this crate's conflict generator instead blames every hole
/// the quotient actually depends on, which is sound (it never excludes a
/// satisfying assignment) but prunes only the single checked assignment per
/// iteration rather than a whole sub-family. See `DESIGN.md`.
pub fn whole_model_conflict(quotient: &QuotientMdp) -> Vec<usize> {
    quotient.quotient_relevant_holes()
}
