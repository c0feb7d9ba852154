//! Prometheus and JSON metrics endpoints.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::state::AppState;

/// GET /metrics - Prometheus text exposition
pub async fn metrics_handler(Extension(handle): Extension<PrometheusHandle>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response()
}

/// GET /api/metrics - Application metrics as JSON
pub async fn api_metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    Json(state.metrics.snapshot().await).into_response()
}
