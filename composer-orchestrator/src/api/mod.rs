//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod channel;
pub mod clone;
pub mod compose;
pub mod error;
pub mod health;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::service::BASE_PATH;
use crate::service::workers::Workers;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub workers: Workers,
    pub config: Arc<Config>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Compose endpoints
        .route("/compose", post(compose::post_compose))
        .route("/composes/{id}", get(compose::get_compose_status))
        .route("/composes/{id}/metadata", get(compose::get_compose_metadata))
        .route("/composes/{id}/logs", get(compose::get_compose_logs))
        .route("/composes/{id}/manifests", get(compose::get_compose_manifests))
        // Clone endpoints
        .route("/composes/{id}/clone", post(clone::post_clone_compose))
        .route("/clones/{id}", get(clone::get_clone_status));

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .nest(BASE_PATH, api)
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
