//! Health check endpoint.
//!
//! Reports per-stage liveness from the topology's heartbeat registry.
//! Liveness is reporting only; an unhealthy stage is surfaced here, not
//! restarted.

use super::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let stages = state.health.snapshot();
    let healthy = state.health.all_alive();

    let status = if healthy { "healthy" } else { "degraded" };
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": status,
            "service": "oerhub-preproc",
            "version": env!("CARGO_PKG_VERSION"),
            "stages": stages,
        })),
    )
}
