use std::sync::Arc;

use chrono::{DateTime, Utc};
use groupci_core::{BuildOrchestrator, Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<BuildOrchestrator>,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<BuildOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            started_at: Utc::now(),
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &BuildOrchestrator {
        self.orchestrator.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
