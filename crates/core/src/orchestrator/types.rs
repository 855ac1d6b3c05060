//! Types for the build orchestrator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Review system error.
    #[error("gerrit error: {0}")]
    Gerrit(#[from] crate::gerrit::GerritError),

    /// Build host error.
    #[error("build host error: {0}")]
    BuildHost(#[from] crate::buildhost::BuildHostError),

    /// Merge-preview bundle error.
    #[error("bundle error: {0}")]
    Bundle(#[from] crate::gerrit::BundleError),
}

/// What prompted a refresh pass. Logged at the head of every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshReason {
    Startup,
    Periodic,
    Webhook,
    Manual,
}

impl fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RefreshReason::Startup => "startup",
            RefreshReason::Periodic => "periodic",
            RefreshReason::Webhook => "webhook",
            RefreshReason::Manual => "manual",
        };
        f.write_str(reason)
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestratorStatus {
    /// Whether the orchestrator is running.
    pub running: bool,
    /// Number of submit groups with builds in flight.
    pub tracked_groups: usize,
    /// When the last refresh pass finished, if any has.
    pub last_refresh: Option<DateTime<Utc>>,
}
