//! integration tests for the `/gate/code` endpoint.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use respite::create_app;
use respite_db::RespiteDb;
use respite_gate::test_utils::{FakeLedger, RecordingGateway};
use respite_gate::{AccessGate, GatePolicy, SystemClock};
use respite_types::{Config, GrantKind, Redemption};
use tower::ServiceExt;

async fn setup_app() -> (Router, FakeLedger) {
    let db = RespiteDb::new_in_memory()
        .await
        .expect("failed to create in-memory database");
    let config = Config::default();
    let ledger = FakeLedger::new();
    let gate = AccessGate::new(
        db.clone(),
        Box::new(RecordingGateway::new()),
        Box::new(ledger.clone()),
        Arc::new(SystemClock),
        GatePolicy::from_config(&config.gate),
    );
    gate.initialize().await.expect("failed to initialize gate");
    (create_app(gate, db, config), ledger)
}

fn post_code(code: &str, duration_seconds: i64) -> Request<Body> {
    let body = serde_json::json!({ "durationSeconds": duration_seconds, "code": code });
    Request::builder()
        .method("POST")
        .uri("/gate/code")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&body).expect("failed to parse body as json")
}

/// test that a valid code opens the gate.
#[tokio::test]
async fn test_valid_code_grants() {
    let (app, ledger) = setup_app().await;
    ledger.insert_code(
        "DAYPASS",
        Redemption {
            kind: GrantKind::Standard,
            duration_secs: Some(3600),
        },
    );

    let response = app
        .oneshot(post_code("DAYPASS", 600))
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["granted"], true);
    assert!(json.get("expiryTime").is_some());
}

/// test that a privileged code starts the cooldown and a second code
/// is refused without spending it.
#[tokio::test]
async fn test_privileged_code_cooldown() {
    let (app, ledger) = setup_app().await;
    ledger.insert_code(
        "VIP-1",
        Redemption {
            kind: GrantKind::Privileged,
            duration_secs: None,
        },
    );
    ledger.insert_code(
        "VIP-2",
        Redemption {
            kind: GrantKind::Privileged,
            duration_secs: None,
        },
    );

    let response = app
        .clone()
        .oneshot(post_code("VIP-1", 1800))
        .await
        .expect("request failed");
    assert_eq!(body_json(response).await["granted"], true);

    let redeems_before = ledger.redeem_calls();
    let response = app
        .clone()
        .oneshot(post_code("VIP-2", 1800))
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["granted"], false);
    assert_eq!(json["reason"], "in_cooldown");
    // the refused request never reached the ledger
    assert_eq!(ledger.redeem_calls(), redeems_before);

    // the cooldown shows up in status
    let request = Request::builder()
        .method("GET")
        .uri("/gate/status")
        .body(Body::empty())
        .expect("failed to build request");
    let response = app.oneshot(request).await.expect("request failed");
    let json = body_json(response).await;
    assert!(json["cooldownRemainingSeconds"].as_i64().unwrap() > 0);
}

/// test that a rejected code answers invalid_code without state change.
#[tokio::test]
async fn test_unknown_code_is_invalid() {
    let (app, _ledger) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_code("NOPE", 600))
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["granted"], false);
    assert_eq!(json["reason"], "invalid_code");

    let request = Request::builder()
        .method("GET")
        .uri("/gate/status")
        .body(Body::empty())
        .expect("failed to build request");
    let response = app.oneshot(request).await.expect("request failed");
    assert_eq!(body_json(response).await["state"], "blocked");
}

/// test that an empty code is a bad request, not a ledger call.
#[tokio::test]
async fn test_empty_code_rejected() {
    let (app, ledger) = setup_app().await;

    let response = app
        .oneshot(post_code("", 600))
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ledger.redeem_calls(), 0);
}
