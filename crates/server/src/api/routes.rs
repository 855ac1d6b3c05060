use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{build_hook, gerrit_hook, handlers};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        .route("/refresh", post(handlers::request_refresh));

    // Webhook routes (event sources push here)
    let hook_routes = Router::new()
        .route("/gerrit", post(gerrit_hook::handle_event))
        .route("/build", post(build_hook::handle_notification));

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/hooks", hook_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
