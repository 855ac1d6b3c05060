use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use groupci_core::{RefreshReason, SanitizedConfig};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub tracked_groups: usize,
    pub last_refresh: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let status = state.orchestrator().status().await;
    Json(StatusResponse {
        running: status.running,
        tracked_groups: status.tracked_groups,
        last_refresh: status.last_refresh,
        started_at: state.started_at(),
    })
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Queue a manual refresh pass.
pub async fn request_refresh(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<MessageResponse>) {
    state.orchestrator().request_refresh(RefreshReason::Manual);
    (
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "refresh queued".to_string(),
        }),
    )
}
