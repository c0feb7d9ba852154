//! Health and readiness handlers.

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub engine: String,
}

/// GET /health - Basic health check
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /ready - Ready while the engine process is alive. Never recovers
/// once the engine has exited.
pub async fn ready_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> (StatusCode, Json<ReadyResponse>) {
    let alive = state.engine_liveness.is_alive();

    let status = if alive {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = ReadyResponse {
        ready: alive,
        engine: if alive { "running" } else { "exited" }.to_string(),
    };

    (status, Json(response))
}
