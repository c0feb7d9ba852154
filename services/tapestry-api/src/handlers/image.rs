//! The image endpoint.
//!
//! `GET /image/<path>` parses the path, waits for the engine, renders, and
//! returns the engine's bytes untouched.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Path},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tapestry_common::{ParseError, RenderingRequest};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::ImageFormat;
use crate::engine::EngineError;
use crate::metrics::RenderTimings;
use crate::options::parse_image_path;
use crate::state::AppState;

pub const RENDER_DURATION_HEADER: HeaderName = HeaderName::from_static("x-render-duration");
pub const ENCODE_DURATION_HEADER: HeaderName = HeaderName::from_static("x-encode-duration");

/// Errors surfaced by the image endpoint.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("too many renders pending")]
    Busy,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Parse(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(EngineError::ProcessExited) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Engine(EngineError::Write(_) | EngineError::Framing(_)) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Engine(EngineError::Spawn { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_exception(&self) -> ExceptionResponse {
        let status = self.status_code();
        ExceptionResponse {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            detail: self.to_string(),
            field: match self {
                ApiError::Parse(e) => Some(e.field().to_string()),
                _ => None,
            },
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ExceptionResponse {
    pub status: u16,
    pub title: String,
    pub detail: String,
    /// The offending path field, for parse failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_exception())).into_response()
    }
}

/// A finished render ready to be written out.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub data: Bytes,
    pub timings: RenderTimings,
}

impl RenderedImage {
    pub fn into_response(self, format: ImageFormat) -> Response {
        let headers = [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_LENGTH, self.data.len().to_string()),
            (RENDER_DURATION_HEADER, self.timings.render_us.to_string()),
            (ENCODE_DURATION_HEADER, self.timings.encode_us.to_string()),
        ];
        (StatusCode::OK, headers, self.data).into_response()
    }
}

/// GET /image/*path
pub async fn image_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    state.metrics.record_image_request();

    let parsed = parse_image_path(&path).map_err(|e| {
        state.metrics.record_parse_error();
        warn!(field = e.field(), error = %e, "Rejected image request");
        e
    })?;

    let image = render_image(&state, parsed.request).await?;
    Ok(image.into_response(state.image_format))
}

/// Run one request through the engine.
///
/// The round-trip runs on its own task which owns the engine guard, so a
/// dropped caller never leaves the pipes mid-frame.
pub async fn render_image(
    state: &Arc<AppState>,
    request: RenderingRequest,
) -> Result<RenderedImage, ApiError> {
    let permit = match &state.admission {
        Some(admission) => match admission.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                state.metrics.record_busy();
                warn!(volume = %request.volume_name, "Render queue full");
                return Err(ApiError::Busy);
            }
        },
        None => None,
    };

    if !state.engine_liveness.is_alive() {
        state.metrics.record_engine_error();
        return Err(EngineError::ProcessExited.into());
    }

    let lock_start = Instant::now();
    let mut engine = state.engine.clone().lock_owned().await;
    let lock_wait = lock_start.elapsed();

    let task_state = state.clone();
    let task = tokio::spawn(async move {
        let _permit = permit;
        let send_start = Instant::now();
        let result = engine.render(&request).await;
        let send = send_start.elapsed();
        drop(engine);

        let metrics = &task_state.metrics;
        match result {
            Ok(response) => {
                let timings = RenderTimings::new(
                    response.render_duration,
                    response.encode_duration,
                    lock_wait,
                    send,
                );
                info!(
                    volume = %request.volume_name,
                    render_us = timings.render_us,
                    encode_us = timings.encode_us,
                    lock_us = timings.lock_us,
                    send_us = timings.send_us,
                    image_length = response.image_length(),
                    "Rendered image"
                );
                metrics.record_render(&timings, response.image_data.len()).await;
                Ok(RenderedImage {
                    data: response.image_data,
                    timings,
                })
            }
            Err(e) => {
                metrics.record_engine_error();
                metrics.record_engine_alive(task_state.engine_liveness.is_alive());
                error!(volume = %request.volume_name, error = %e, "Render failed");
                Err(ApiError::Engine(e))
            }
        }
    });

    task.await
        .map_err(|e| ApiError::Internal(format!("render task failed: {e}")))?
}
