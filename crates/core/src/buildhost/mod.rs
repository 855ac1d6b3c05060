//! Build host abstraction.
//!
//! The [`BuildHost`] trait covers the job inventory, parameterized build
//! triggering and stale-build cancellation. Start/finish notifications flow
//! back through the server's notification webhook, carrying the
//! [`BuildCause`] attached at trigger time.

mod jenkins;
mod types;

pub use jenkins::JenkinsClient;
pub use types::{
    BuildCause, BuildHost, BuildHostError, BuildOutcome, BuildParameters, BuildRun, JobInfo,
    ProjectMatcher, CAUSE_PARAMETER,
};
