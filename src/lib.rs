//! Synthesis core for probabilistic program sketches: a family/design-space
//! algebra over a quotient Markov model, four search strategies over it
//! (exhaustive, abstraction-refinement, CEGIS, and a hybrid of the two),
//! and a POMDP memory-refinement driver built on top of them.

pub mod error;
pub mod family;
pub mod options;
pub mod pomdp;
pub mod quotient;
pub mod sketch;
pub mod specification;
pub mod stats;
pub mod synthesizer;

use error::Result;
use family::Assignment;
use options::SynthesisMethod;
use pomdp::{Fsc, SynthesizerPomdp};
use sketch::Sketch;
use stats::Statistic;
use synthesizer::ar::SynthesizerAr;
use synthesizer::cegis::SynthesizerCegis;
use synthesizer::hybrid::SynthesizerHybrid;
use synthesizer::one_by_one::OneByOne;
use synthesizer::{Deadline, Synthesizer};

/// Runs the chosen search strategy over `sketch`, returning the best
/// assignment found before the family was exhausted or `deadline` elapsed,
/// plus the statistics gathered along the way.
///
/// Family exhaustion and timeout are both normal outcomes represented as
/// `Ok(None)`/`Ok(Some(..))`; only a parse, specification, or model-checker
/// failure is an `Err` (see `SPEC_FULL.md` §7).
pub fn synthesize(
    sketch: &Sketch,
    method: SynthesisMethod,
    deadline: Deadline,
) -> Result<(Option<Assignment>, Statistic)> {
    let mut spec = sketch.specification.clone();
    let mut stats = Statistic::new();
    let family = sketch.design_space.clone();

    let result = match method {
        SynthesisMethod::OneByOne => {
            OneByOne.synthesize(&sketch.quotient, family, &mut spec, &mut stats, deadline)?
        }
        SynthesisMethod::Ar => {
            SynthesizerAr.synthesize(&sketch.quotient, family, &mut spec, &mut stats, deadline)?
        }
        SynthesisMethod::Cegis => {
            SynthesizerCegis.synthesize(&sketch.quotient, family, &mut spec, &mut stats, deadline)?
        }
        SynthesisMethod::Hybrid => SynthesizerHybrid::default().synthesize(
            &sketch.quotient,
            family,
            &mut spec,
            &mut stats,
            deadline,
        )?,
    };

    Ok((result, stats))
}

/// Runs the POMDP memory-refinement driver over `sketch`, synthesizing a
/// finite-state controller instead of a single memoryless assignment.
pub fn synthesize_pomdp(sketch: &Sketch, deadline: Deadline) -> Result<Option<Fsc>> {
    SynthesizerPomdp.run(sketch, deadline)
}
