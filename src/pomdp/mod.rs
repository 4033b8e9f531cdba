//! The POMDP memory-refinement driver (C9): wraps AR/Hybrid search in an
//! outer loop that injects finite memory where it pays off, synthesizing a
//! finite-state controller for a partially observable sketch instead of a
//! single memoryless assignment.

pub mod driver;
pub mod fsc;
pub mod hole_tree;

pub use driver::SynthesizerPomdp;
pub use fsc::{ActionEntry, Fsc};
pub use hole_tree::HoleTree;
