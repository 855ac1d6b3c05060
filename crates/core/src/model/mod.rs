//! Core data model: changes, submit groups and build targets.
//!
//! A *submit group* is the minimal set of open changes that Gerrit would
//! merge together, hence the unit that gets verified together. A *build
//! target* is one (project, branch) pair that a submit group requires a
//! build for.

mod types;

pub use types::{BuildKey, BuildTarget, Change, GroupKey, SubmitGroup};
