//! The family/design-space algebra: holes, design spaces, assignments, and
//! the incremental SAT encoding used to enumerate and prune them.

pub mod design_space;
pub mod encoding;
pub mod hole;

pub use design_space::{Assignment, DesignSpace};
pub use encoding::Encoding;
pub use hole::Hole;
