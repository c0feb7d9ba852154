//! Volume rendering HTTP service library.
//!
//! This module exposes the internal modules for testing purposes.

pub mod config;
pub mod engine;
pub mod handlers;
pub mod metrics;
pub mod options;
pub mod state;

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Build the service router.
pub fn router(state: Arc<AppState>, prometheus: PrometheusHandle) -> Router {
    Router::new()
        // Rendering
        .route("/image/*path", get(handlers::image_handler))
        // Health check
        .route("/health", get(handlers::health_handler))
        .route("/ready", get(handlers::ready_handler))
        // Metrics
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/metrics", get(handlers::api_metrics_handler))
        // Layer extensions
        .layer(Extension(state))
        .layer(Extension(prometheus))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
