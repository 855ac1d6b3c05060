//! Resolution of open changes into submit groups and build targets.

mod groups;
mod targets;

pub use groups::resolve_submit_groups;
pub use targets::resolve_build_targets;
