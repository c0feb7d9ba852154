//! HTTP tests for the router, backed by the in-process mock engine.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use tapestry_api::config::{ImageFormat, ServiceConfig};
use tapestry_api::engine::EngineChannel;
use tapestry_api::options::parse_image_path;
use tapestry_api::router;
use tapestry_api::state::AppState;
use tapestry_protocol::encode_request;
use test_utils::{MockEngine, MockPayload};
use tower::ServiceExt;

const CAMERA: &str = "1/0/1/0/1/0/-1/0/-1";

fn test_app(engine: MockEngine, config: ServiceConfig) -> (Router, Arc<AppState>) {
    let pipes = engine.spawn();
    let channel = EngineChannel::from_pipes(pipes.stdin, pipes.stdout);
    let state = Arc::new(AppState::new(channel, &config));
    let handle = PrometheusBuilder::new().build_recorder().handle();
    (router(state.clone(), handle), state)
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn image_path(volume: &str) -> String {
    format!("{volume}/{CAMERA}/256/,colormap=viridis,tiling=2-4")
}

// ============================================================================
// Image endpoint
// ============================================================================

#[tokio::test]
async fn test_image_returns_engine_bytes() {
    let (app, state) = test_app(MockEngine::new(), ServiceConfig::default());
    let path = image_path("supernova");

    let response = get(app, &format!("/image/{path}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    assert!(headers.contains_key("x-render-duration"));
    assert!(headers.contains_key("x-encode-duration"));

    let body = body_bytes(response).await;
    let expected = encode_request(&parse_image_path(&path).unwrap().request);
    assert_eq!(body, expected.into_bytes());
    assert_eq!(headers[header::CONTENT_LENGTH], body.len().to_string().as_str());

    let snapshot = state.metrics.snapshot().await;
    assert_eq!(snapshot.image_requests, 1);
    assert_eq!(snapshot.renders_total, 1);
}

#[tokio::test]
async fn test_png_format() {
    let config = ServiceConfig {
        image_format: ImageFormat::Png,
        ..ServiceConfig::default()
    };
    let (app, _) = test_app(MockEngine::new().with_payload(MockPayload::Png), config);

    let response = get(app, &format!("/image/volume/{CAMERA}/32/,background=255/0/0/255")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let body = body_bytes(response).await;
    assert!(body.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[tokio::test]
async fn test_parse_error_is_bad_request() {
    let (app, state) = test_app(MockEngine::new(), ServiceConfig::default());

    let response = get(app, &format!("/image/volume/{CAMERA}/256/,background=1/2/3")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["status"], 400);
    assert_eq!(json["field"], "background");

    assert_eq!(state.metrics.snapshot().await.parse_errors, 1);
    assert_eq!(state.engine.lock().await.renders(), 0);
}

#[tokio::test]
async fn test_dead_engine_is_service_unavailable() {
    let (app, state) = test_app(MockEngine::new(), ServiceConfig::default());
    state.engine_liveness.mark_dead();

    let response = get(app.clone(), &format!("/image/{}", image_path("volume"))).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["status"], 503);

    let response = get(app, "/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["engine"], "exited");
}

#[tokio::test]
async fn test_framing_error_is_bad_gateway_and_sticks() {
    let (app, _) = test_app(MockEngine::new().truncate_response(0), ServiceConfig::default());
    let uri = format!("/image/{}", image_path("volume"));

    let response = get(app.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = get(app, &uri).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_are_paired() {
    let (app, state) = test_app(
        MockEngine::new().with_delay(Duration::from_millis(2)),
        ServiceConfig::default(),
    );

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let path = image_path(&format!("volume{i}"));
                let response = get(app, &format!("/image/{path}")).await;
                assert_eq!(response.status(), StatusCode::OK);
                (path, body_bytes(response).await)
            })
        })
        .collect();

    for task in tasks {
        let (path, body) = task.await.unwrap();
        let expected = encode_request(&parse_image_path(&path).unwrap().request);
        assert_eq!(body, expected.into_bytes(), "response mismatched for {path}");
    }

    assert_eq!(state.engine.lock().await.renders(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abandoned_request_does_not_desync_engine() {
    let (app, state) = test_app(
        MockEngine::new().with_delay(Duration::from_millis(200)),
        ServiceConfig::default(),
    );

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        get(app.clone(), &format!("/image/{}", image_path("a"))),
    )
    .await;
    assert!(abandoned.is_err(), "request should still be rendering");

    let path = image_path("b");
    let response = get(app, &format!("/image/{path}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let expected = encode_request(&parse_image_path(&path).unwrap().request);
    assert_eq!(body, expected.into_bytes());

    assert_eq!(state.engine.lock().await.renders(), 2);
    assert!(state.engine_liveness.is_alive());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_admission_limit_rejects_when_full() {
    let config = ServiceConfig {
        max_pending_renders: Some(1),
        ..ServiceConfig::default()
    };
    let (app, state) = test_app(MockEngine::new().with_delay(Duration::from_millis(300)), config);
    let uri = format!("/image/{}", image_path("volume"));

    let first = {
        let app = app.clone();
        let uri = uri.clone();
        tokio::spawn(async move { get(app, &uri).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = get(app.clone(), &uri).await;
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);

    let first = first.await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let third = get(app, &uri).await;
    assert_eq!(third.status(), StatusCode::OK);
    assert_eq!(state.metrics.snapshot().await.busy_rejections, 1);
}

// ============================================================================
// Health and metrics
// ============================================================================

#[tokio::test]
async fn test_health_and_ready() {
    let (app, _) = test_app(MockEngine::new(), ServiceConfig::default());

    let response = get(app.clone(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");

    let response = get(app, "/ready").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ready"], true);
    assert_eq!(json["engine"], "running");
}

#[tokio::test]
async fn test_metrics_endpoints() {
    let (app, _) = test_app(MockEngine::new(), ServiceConfig::default());

    let response = get(app.clone(), "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app, "/api/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["renders_total"], 0);
}
