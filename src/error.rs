//! Error kinds produced by the synthesis core.

use std::fmt;

/// Errors that can occur while ingesting a sketch or running a synthesizer.
///
/// This replaces the `assert`/`exit(1)` control flow of the tool this crate
/// is modeled after with explicit, catchable error values.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// The sketch or properties file could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
    /// The specification is structurally invalid, e.g. it declares more than
    /// one optimality objective.
    #[error("invalid specification: {0}")]
    InvalidSpecification(String),
    /// The requested synthesizer cannot handle the given specification, e.g.
    /// CEGIS with a maximizing reward objective.
    #[error("unsupported specification: {0}")]
    UnsupportedSpecification(String),
    /// The explicit-state model checker failed to converge or was asked to
    /// evaluate a formula it does not support.
    #[error("model checker failure: {0}")]
    ModelCheckerFailure(String),
    /// After hole and constant substitution, a free identifier remained in
    /// the sketch body.
    #[error("undefined constant: {0}")]
    UndefinedConstant(String),
    /// A sketch or properties file could not be read from disk.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthesisError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub(crate) fn invalid_specification(msg: impl Into<String>) -> Self {
        Self::InvalidSpecification(msg.into())
    }

    pub(crate) fn unsupported_specification(msg: impl Into<String>) -> Self {
        Self::UnsupportedSpecification(msg.into())
    }

    pub(crate) fn model_checker_failure(msg: impl Into<String>) -> Self {
        Self::ModelCheckerFailure(msg.into())
    }

    pub(crate) fn undefined_constant(name: impl fmt::Display) -> Self {
        Self::UndefinedConstant(name.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SynthesisError>;
