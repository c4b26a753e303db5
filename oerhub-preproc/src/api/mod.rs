//! HTTP API for the preprocessing service.

pub mod health;

use crate::topology::HealthRegistry;
use std::sync::Arc;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct AppState {
    pub health: Arc<HealthRegistry>,
}

/// Build the service router.
pub fn build_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(health::health_check))
        .with_state(state)
}
