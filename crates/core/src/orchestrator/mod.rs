//! Build orchestrator.
//!
//! The orchestrator reconciles the review system with the build host:
//! - **Refresh**: sequential (one pass at a time), queued and coalesced
//! - **Notifications**: applied as they arrive, routed by build cause
//! - **Verdicts**: posted back to the review system on lifecycle edges

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::BuildOrchestrator;
pub use types::{OrchestratorError, OrchestratorStatus, RefreshReason};
