#![cfg(feature = "docker")]

//! Health check endpoint tests.
//!
//! Exercises `/health`, `/ready`, and `/live` through the full router,
//! verifying response shape, database connectivity reporting, and
//! behavior under concurrent probes.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use housecall_api::{create_router, AppState, Config};
use housecall_testing::TestEnv;
use serde_json::Value;
use tower::ServiceExt;

/// Builds the service router over the environment's database.
fn build_app(env: &TestEnv) -> Router {
    let mut config = Config::default();
    config.pipeline_version = env.version().to_string();
    let state =
        AppState::new(&config, env.pool().clone()).expect("failed to build application state");
    create_router(state, Duration::from_secs(30))
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body should be valid JSON")
}

#[tokio::test]
async fn health_reports_healthy_database() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    let app = build_app(&env);

    let response = app.oneshot(get_request("/health")).await.expect("failed to make request");
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .expect("health check should have content-type header");
    assert!(content_type.to_str().unwrap().contains("application/json"));

    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"]["status"], "up");
    assert!(body["checks"]["database"]["response_time_ms"].is_number());
    assert!(body["version"].is_string(), "health check should report the service version");
    assert!(body["timestamp"].is_string(), "health check should carry a timestamp");
}

#[tokio::test]
async fn readiness_mirrors_the_health_check() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    let app = build_app(&env);

    let response = app.oneshot(get_request("/ready")).await.expect("failed to make request");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["checks"]["database"].is_object());
}

#[tokio::test]
async fn liveness_answers_without_touching_dependencies() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    let app = build_app(&env);

    let response = app.oneshot(get_request("/live")).await.expect("failed to make request");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], "alive");
    assert_eq!(body["service"], "housecall-api");
    assert!(body.get("checks").is_none(), "liveness should not run dependency checks");
}

#[tokio::test]
async fn health_handles_concurrent_requests() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    let app = build_app(&env);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.oneshot(get_request("/health")).await.expect("failed to make request")
        }));
    }

    let responses = futures::future::join_all(handles).await;
    for result in responses {
        let response = result.expect("health check task should complete");
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn health_rejects_non_get_methods() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    let app = build_app(&env);

    let request = Request::builder().method("POST").uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.expect("failed to make request");
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    let app = build_app(&env);

    let response = app.oneshot(get_request("/health")).await.expect("failed to make request");

    let request_id = response
        .headers()
        .get("X-Request-Id")
        .expect("responses should carry X-Request-Id")
        .to_str()
        .expect("request id should be ASCII");
    assert!(uuid::Uuid::parse_str(request_id).is_ok(), "request id should be a UUID");
}
