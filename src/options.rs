//! Command-line options for the `qsynth` binary: a `clap`-derived struct
//! plus small `ValueEnum` option types with a `Display` impl each.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Which search strategy drives synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SynthesisMethod {
    /// Exhaustive enumeration of every assignment; a correctness baseline.
    OneByOne,
    /// Abstraction-refinement over the quotient MDP.
    Ar,
    /// Counterexample-guided inductive synthesis.
    Cegis,
    /// Interleaves AR and CEGIS, picking whichever is pruning faster.
    Hybrid,
}

impl std::fmt::Display for SynthesisMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OneByOne => "one-by-one",
            Self::Ar => "ar",
            Self::Cegis => "cegis",
            Self::Hybrid => "hybrid",
        };
        write!(f, "{}", name)
    }
}

/// The log level `env_logger` is initialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraceLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<TraceLevel> for log::LevelFilter {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Error => log::LevelFilter::Error,
            TraceLevel::Warn => log::LevelFilter::Warn,
            TraceLevel::Info => log::LevelFilter::Info,
            TraceLevel::Debug => log::LevelFilter::Debug,
            TraceLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Output format for a successful synthesis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `name=option_label, ...` rendering of the winning assignment.
    Assignment,
    /// The synthesized finite-state controller, as FSC JSON (POMDP sketches
    /// only).
    Fsc,
}

/// Synthesize a finite-state controller, or a single memoryless
/// assignment, from a probabilistic program sketch.
#[derive(Debug, Parser)]
#[command(name = "qsynth", version, about)]
pub struct CliOptions {
    /// Path to the sketch file (a PRISM-subset guarded-command program with
    /// `hole` declarations).
    pub sketch_file: PathBuf,

    /// Path to the properties file (constraint and optimality formulae).
    pub properties_file: PathBuf,

    /// Comma-separated `name=value` constant definitions, e.g.
    /// `"N=5,p=0.3"`.
    #[arg(long, default_value = "")]
    pub constants: String,

    /// The search strategy to run.
    #[arg(long, value_enum, default_value_t = SynthesisMethod::Hybrid)]
    pub method: SynthesisMethod,

    /// Treat the sketch as a POMDP and run the memory-refinement driver
    /// instead of a single-strategy search. Requires `observable`
    /// declarations in the sketch.
    #[arg(long)]
    pub pomdp: bool,

    /// Wall-clock budget in seconds; synthesis returns its best
    /// witness-so-far once exceeded instead of erroring.
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// How to render a successful result.
    #[arg(long, value_enum, default_value_t = OutputFormat::Assignment)]
    pub output_format: OutputFormat,

    /// Path to write the result to; stdout if omitted.
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Logging verbosity.
    #[arg(long, value_enum, default_value_t = TraceLevel::Info)]
    pub trace_level: TraceLevel,
}
