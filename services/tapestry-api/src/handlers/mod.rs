//! HTTP request handlers.
//!
//! - `image`: the render endpoint and its error mapping
//! - `health`: liveness and readiness probes
//! - `metrics`: Prometheus exposition and the JSON metrics snapshot

pub mod health;
pub mod image;
pub mod metrics;

pub use health::{health_handler, ready_handler, HealthResponse, ReadyResponse};
pub use image::{image_handler, render_image, ApiError, ExceptionResponse, RenderedImage};
pub use metrics::{api_metrics_handler, metrics_handler};
