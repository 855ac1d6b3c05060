//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of the collaborator traits,
//! allowing full lifecycle testing without a review system or build host.
//!
//! # Example
//!
//! ```rust,ignore
//! use groupci_core::testing::{MockBuildHost, MockGerritClient};
//!
//! let gerrit = MockGerritClient::new();
//! let build_host = MockBuildHost::new();
//!
//! // Configure mock responses
//! gerrit.add_open_change(change).await;
//! build_host.add_job(job).await;
//!
//! // Drive the orchestrator against them...
//! ```

mod mock_build_host;
mod mock_gerrit;

pub use mock_build_host::{MockBuildHost, RecordedTrigger};
pub use mock_gerrit::{MockGerritClient, RecordedReview};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::buildhost::JobInfo;
    use crate::model::Change;

    /// Create a test change with reasonable defaults.
    pub fn change(number: u32, patchset: u32) -> Change {
        Change::new(
            number,
            patchset,
            format!("I{:040}", number),
            format!("Change {}", number),
            false,
        )
    }

    /// Create a test change that already carries a Verified vote.
    pub fn verified_change(number: u32, patchset: u32) -> Change {
        let mut c = change(number, patchset);
        c.verified = true;
        c
    }

    /// Create a test job whose checkout URL covers `project`.
    pub fn job_for_project(name: &str, project: &str) -> JobInfo {
        JobInfo::new(
            name,
            vec![format!("https://gerrit.example.com/a/{}.git", project)],
        )
    }

    /// A minimal bundle ref listing advertising one branch head.
    pub fn bundle_text(branch: &str) -> String {
        format!("# v2 git bundle\n\nabc123 refs/heads/{}\n", branch)
    }
}
