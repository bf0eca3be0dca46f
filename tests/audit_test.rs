#![cfg(feature = "docker")]

//! Audit trail tests.
//!
//! Every webhook delivery must leave an audit row before any gating or
//! parsing decision, including deliveries we refuse to process. These
//! tests drive the HTTP surface and assert on the `webhook_events`
//! table through storage.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use housecall_api::{create_router, AppState, Config};
use housecall_ingest::FLAG_RETELL_CALLS;
use housecall_testing::{CincLeadBuilder, RetellCallBuilder, TestEnv};
use serde_json::Value;
use tower::ServiceExt;

fn build_app(env: &TestEnv) -> Router {
    let mut config = Config::default();
    config.pipeline_version = env.version().to_string();
    config.flag_cache_ttl_seconds = 0;
    let state =
        AppState::new(&config, env.pool().clone()).expect("failed to build application state");
    create_router(state, Duration::from_secs(30))
}

async fn post_json(app: &Router, uri: &str, payload: &Value) -> axum::response::Response {
    post_raw(app, uri, payload.to_string()).await
}

async fn post_raw(
    app: &Router,
    uri: &str,
    body: impl Into<axum::body::Bytes>,
) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap();
    app.clone().oneshot(request).await.expect("failed to make request")
}

#[tokio::test]
async fn processed_deliveries_are_audited_with_their_payload() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    env.enable_feature(FLAG_RETELL_CALLS).await.expect("failed to enable flag");
    let app = build_app(&env);

    let payload = RetellCallBuilder::new("call_audit_1").started();
    let response = post_json(&app, "/webhooks/retell", &payload).await;
    assert_eq!(response.status(), StatusCode::OK);

    let count = env.audit_count("retell", "call_started").await.expect("count should succeed");
    assert_eq!(count, 1);

    let events = env
        .storage()
        .webhook_events
        .find_recent("retell", 1)
        .await
        .expect("listing should succeed");
    assert_eq!(events[0].payload, payload, "the audit row keeps the full original payload");
}

#[tokio::test]
async fn gated_deliveries_are_still_audited() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    let app = build_app(&env);

    let payload = RetellCallBuilder::new("call_audit_2").started();
    let response = post_json(&app, "/webhooks/retell", &payload).await;
    assert_eq!(response.status(), StatusCode::OK);

    let count = env.audit_count("retell", "call_started").await.expect("count should succeed");
    assert_eq!(count, 1, "the audit must run before the feature gate");

    let conversations = env.storage().conversations.count().await.expect("count should succeed");
    assert_eq!(conversations, 0);
}

#[tokio::test]
async fn unrecognized_event_types_are_audited_verbatim() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    env.enable_feature(FLAG_RETELL_CALLS).await.expect("failed to enable flag");
    let app = build_app(&env);

    let payload = serde_json::json!({
        "event": "coaching_tip",
        "call": {"call_id": "call_audit_3"}
    });
    let response = post_json(&app, "/webhooks/retell", &payload).await;
    assert_eq!(response.status(), StatusCode::OK);

    let count = env.audit_count("retell", "coaching_tip").await.expect("count should succeed");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn rejected_deliveries_are_audited() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    env.enable_feature(FLAG_RETELL_CALLS).await.expect("failed to enable flag");
    let app = build_app(&env);

    let payload = serde_json::json!({"event": "call_started", "call": {}});
    let response = post_json(&app, "/webhooks/retell", &payload).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let count = env.audit_count("retell", "call_started").await.expect("count should succeed");
    assert_eq!(count, 1, "validation failures still leave a trace");
}

#[tokio::test]
async fn unparseable_bodies_are_audited_with_a_raw_sample() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    let app = build_app(&env);

    let response = post_raw(&app, "/webhooks/retell", "definitely not json {{{").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let count = env.audit_count("retell", "parse_error").await.expect("count should succeed");
    assert_eq!(count, 1);

    let events = env
        .storage()
        .webhook_events
        .find_recent("retell", 1)
        .await
        .expect("listing should succeed");
    let raw = events[0].payload["raw"].as_str().expect("parse_error rows keep a raw sample");
    assert!(raw.contains("definitely not json"));
    assert_eq!(events[0].provider_event_id, None);
}

#[tokio::test]
async fn audit_rows_capture_the_provider_event_id() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    let app = build_app(&env);

    // No flag enabled; the identifier is captured before gating.
    let payload = RetellCallBuilder::new("call_audit_6").started();
    post_json(&app, "/webhooks/retell", &payload).await;

    let events = env
        .storage()
        .webhook_events
        .find_recent("retell", 1)
        .await
        .expect("listing should succeed");
    assert_eq!(events[0].provider_event_id.as_deref(), Some("call_audit_6"));
}

#[tokio::test]
async fn audit_listing_is_newest_first() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    env.enable_feature(FLAG_RETELL_CALLS).await.expect("failed to enable flag");
    let app = build_app(&env);

    let call = RetellCallBuilder::new("call_audit_7")
        .ended_at_ms(1_700_000_060_000)
        .duration_ms(60_000);
    post_json(&app, "/webhooks/retell", &call.started()).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    post_json(&app, "/webhooks/retell", &call.ended()).await;

    let events = env
        .storage()
        .webhook_events
        .find_recent("retell", 10)
        .await
        .expect("listing should succeed");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "call_ended");
    assert_eq!(events[1].event_type, "call_started");
}

#[tokio::test]
async fn lead_deliveries_are_audited_under_their_own_provider() {
    let env = TestEnv::new().await.expect("failed to create test environment");
    let app = build_app(&env);

    let payload = CincLeadBuilder::new("+15557001000").build();
    let response = post_json(&app, "/webhooks/cinc", &payload).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cinc = env.audit_count("cinc", "new_lead").await.expect("count should succeed");
    assert_eq!(cinc, 1);
    let retell = env.audit_count("retell", "new_lead").await.expect("count should succeed");
    assert_eq!(retell, 0);
}
