//! Sketch-file and properties-file ingestion: parses the PRISM-subset sketch
//! text into a [`Program`](program::Program), builds its quotient MDP and
//! design space, parses the properties file into a [`Specification`], and
//! bundles all three into a [`Sketch`] — the one value the CLI binary and
//! the integration tests actually drive.

pub mod build;
pub mod expr;
pub mod parser;
pub mod program;
pub mod properties;

use std::path::Path;

use fs_err as fs;

use crate::error::Result;
use crate::family::DesignSpace;
use crate::quotient::QuotientMdp;
use crate::specification::Specification;

/// A fully loaded synthesis problem: the quotient MDP and design space built
/// from a sketch file, and the specification parsed from a properties file.
#[derive(Debug)]
pub struct Sketch {
    pub quotient: QuotientMdp,
    pub design_space: DesignSpace,
    pub specification: Specification,
    /// Names of the `observable` variables declared by the sketch, in
    /// declaration order. Empty for a non-POMDP sketch.
    pub observables: Vec<String>,
}

impl Sketch {
    /// Loads a sketch and its properties file from disk, substituting
    /// `constants_str` (a `--constants "k1=v1,k2=v2"`-style string, possibly
    /// empty) for every declared constant that isn't itself a hole.
    pub fn load(sketch_path: &Path, properties_path: &Path, constants_str: &str) -> Result<Self> {
        let sketch_text = fs::read_to_string(sketch_path)?;
        let properties_text = fs::read_to_string(properties_path)?;
        Self::from_text(&sketch_text, &properties_text, constants_str)
    }

    /// As [`Sketch::load`], but from already-read file contents. Split out
    /// so tests can build a [`Sketch`] from inline strings without touching
    /// the filesystem.
    pub fn from_text(sketch_text: &str, properties_text: &str, constants_str: &str) -> Result<Self> {
        let program = program::parse_sketch(sketch_text, constants_str)?;
        let (quotient, design_space) = build::build_quotient(&program)?;
        let specification = properties::parse_specification(properties_text)?;
        Ok(Sketch {
            quotient,
            design_space,
            specification,
            observables: program.observables,
        })
    }

    /// Whether this sketch declares any `observable` variables, i.e. is a
    /// POMDP sketch rather than a plain MDP one.
    pub fn is_pomdp(&self) -> bool {
        !self.observables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKETCH: &str = r#"
hole int target in {1, 2};
module main
  x : [0..2] init 0;
  [] x < target -> 1.0 : x'=x+1;
  [] x >= target -> true;
endmodule

label "goal" = x = target;
"#;

    const PROPERTIES: &str = r#"P>=1 [F "goal"];"#;

    #[test]
    fn test_load_from_text_builds_quotient_and_specification() {
        let sketch = Sketch::from_text(SKETCH, PROPERTIES, "").unwrap();
        assert_eq!(sketch.design_space.num_holes(), 1);
        assert_eq!(sketch.specification.constraints.len(), 1);
        assert!(!sketch.is_pomdp());
    }

    #[test]
    fn test_observables_propagate_from_program() {
        let sketch_text = r#"
module main
  o : [0..1] init 0;
  [] o = 0 -> 1.0 : o'=1;
endmodule
observable o;
label "goal" = o = 1;
"#;
        let sketch = Sketch::from_text(sketch_text, PROPERTIES, "").unwrap();
        assert_eq!(sketch.observables, vec!["o".to_string()]);
        assert!(sketch.is_pomdp());
    }
}
