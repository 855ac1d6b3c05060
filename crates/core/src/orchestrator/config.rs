//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the build orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Enable/disable the orchestrator.
    /// When disabled, refreshes only happen via the manual API endpoint.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How often to run a full refresh pass regardless of webhook activity
    /// (seconds). Webhooks make refreshes prompt; the timer makes them
    /// inevitable.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Capacity of the refresh queue. Requests beyond this are dropped,
    /// which is harmless: a queued refresh observes all state changes that
    /// preceded it.
    #[serde(default = "default_queue_capacity")]
    pub refresh_queue_capacity: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_refresh_interval() -> u64 {
    300 // 5 minutes
}

fn default_queue_capacity() -> usize {
    16
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            refresh_interval_secs: default_refresh_interval(),
            refresh_queue_capacity: default_queue_capacity(),
        }
    }
}
