//! `qsynth` binary: a thin CLI front end over the synthesis core. All
//! decision logic lives in the library; this binary only parses options,
//! loads the sketch, runs the chosen synthesizer, and renders the result.

use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use fs_err as fs;

use qsynth::error::{Result, SynthesisError};
use qsynth::options::{CliOptions, OutputFormat};
use qsynth::sketch::Sketch;
use qsynth::synthesizer::Deadline;
use qsynth::{synthesize, synthesize_pomdp};

fn main() {
    if let Err(error) = run() {
        let _ = writeln!(io::stderr(), "Error: {}", error);
        std::process::exit(1);
    }
}

fn initialize_logging(options: &CliOptions) -> io::Result<()> {
    env_logger::builder()
        .filter(None, options.trace_level.into())
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

fn run() -> Result<()> {
    let options = CliOptions::parse();
    initialize_logging(&options)?;

    let sketch = Sketch::load(&options.sketch_file, &options.properties_file, &options.constants)?;

    let deadline = match options.timeout_seconds {
        Some(seconds) => Deadline::after(Duration::from_secs(seconds)),
        None => Deadline::none(),
    };

    let output = if options.pomdp {
        let fsc = synthesize_pomdp(&sketch, deadline)?;
        render_pomdp(&sketch, fsc, options.output_format)?
    } else {
        let (assignment, stats) = synthesize(&sketch, options.method, deadline)?;
        log::info!("{}", stats);
        render_assignment(assignment, options.output_format)?
    };

    match &options.output_file {
        Some(path) => fs::write(path, output)?,
        None => writeln!(io::stdout(), "{}", output)?,
    }
    Ok(())
}

fn render_assignment(
    assignment: Option<qsynth::family::Assignment>,
    format: OutputFormat,
) -> Result<String> {
    match assignment {
        None => Ok("infeasible".to_string()),
        Some(assignment) => match format {
            OutputFormat::Assignment => Ok(render_assignment_labels(&assignment)),
            OutputFormat::Fsc => Err(SynthesisError::InvalidSpecification(
                "--output-format fsc requires --pomdp".to_string(),
            )),
        },
    }
}

fn render_assignment_labels(assignment: &qsynth::family::Assignment) -> String {
    let family = assignment.as_design_space();
    (0..assignment.num_holes())
        .map(|hole| format!("{}={}", family.hole(hole).name(), assignment.label(hole)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_pomdp(sketch: &Sketch, fsc: Option<qsynth::pomdp::Fsc>, format: OutputFormat) -> Result<String> {
    if !sketch.is_pomdp() {
        return Err(SynthesisError::InvalidSpecification(
            "--pomdp given for a sketch with no observable variables".to_string(),
        ));
    }
    match fsc {
        None => Ok("infeasible".to_string()),
        Some(fsc) => match format {
            OutputFormat::Fsc => fsc.to_json(),
            OutputFormat::Assignment => Err(SynthesisError::InvalidSpecification(
                "--pomdp synthesizes a controller, not a single assignment; pass --output-format fsc".to_string(),
            )),
        },
    }
}
