// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end flow through the HTTP surface: intake -> cancellation ->
//! claim, against a real SQLite store with recording mock senders.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use waitline::serve::{build_router, build_state_with_senders};
use waitline_config::WaitlineConfig;
use waitline_storage::SqliteStore;
use waitline_test_utils::{MockEmail, MockSms};

const SALON: &str = "0d2a7e6a-57a5-4f3e-9f07-0e1e60761001";
const SERVICE: &str = "0d2a7e6a-57a5-4f3e-9f07-0e1e60761003";

struct App {
    router: Router,
    sms: Arc<MockSms>,
    _dir: tempfile::TempDir,
}

async fn app() -> App {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("e2e.db");

    let mut config = WaitlineConfig::default();
    config.claims.token_secret = Some("e2e-secret-0123456789abcdef".to_string());
    config.claims.public_base_url = "https://book.example.com".to_string();

    let store = SqliteStore::open(db_path.to_str().unwrap()).await.unwrap();
    let sms = Arc::new(MockSms::new());
    let email = Arc::new(MockEmail::new());
    let state =
        build_state_with_senders(&config, store, sms.clone(), email.clone()).unwrap();

    App {
        router: build_router(state),
        sms,
        _dir: dir,
    }
}

async fn send_json(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, value)
}

fn intake_body(customer_id: &str) -> serde_json::Value {
    serde_json::json!({
        "customer_id": customer_id,
        "display_name": "Ada Lovelace",
        "email": "ada@example.com",
        "phone": "+15551230001",
        "service_id": SERVICE,
        "preferred_date": "2025-06-01",
        "preference_mode": "specific_time",
        "preferred_time_start": "14:00",
        "flex_window_minutes": 0,
    })
}

fn cancellation_body() -> serde_json::Value {
    serde_json::json!({
        "service_id": SERVICE,
        "date": "2025-06-01",
        "start": "2025-06-01T14:00:00Z",
        "end": "2025-06-01T15:00:00Z",
    })
}

fn extract_token(sms_body: &str) -> String {
    sms_body
        .split("token=")
        .nth(1)
        .expect("sms body carries a claim link")
        .split_whitespace()
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn intake_cancellation_accept_flow() {
    let app = app().await;

    // Intake creates a waiting entry.
    let (status, body) = send_json(
        &app.router,
        "POST",
        &format!("/v1/salons/{SALON}/waitlist"),
        Some(intake_body("0d2a7e6a-57a5-4f3e-9f07-0e1e60761002")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "waiting");

    // A cancellation at exactly the preferred time notifies the entry.
    let (status, body) = send_json(
        &app.router,
        "POST",
        &format!("/v1/salons/{SALON}/cancellations"),
        Some(cancellation_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notified"], true, "{body}");

    // The same freed slot again is an idempotent no-op.
    let (_, body) = send_json(
        &app.router,
        "POST",
        &format!("/v1/salons/{SALON}/cancellations"),
        Some(cancellation_body()),
    )
    .await;
    assert_eq!(body["notified"], false, "duplicate slot must be a no-op");

    // Accept within the window books the entry.
    let token = extract_token(&app.sms.sent()[0].1);
    let (status, body) = send_json(
        &app.router,
        "GET",
        &format!("/v1/salons/{SALON}/claim?action=accept&token={token}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["result"], "accepted");
    assert!(body["booking_id"].is_string());

    // A second resolution attempt reports the conflict.
    let (status, body) = send_json(
        &app.router,
        "GET",
        &format!("/v1/salons/{SALON}/claim?action=decline&token={token}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_resolved");
    assert_eq!(body["status"], "accepted");
}

#[tokio::test]
async fn decline_flow_requeues_with_cooldown() {
    let app = app().await;

    send_json(
        &app.router,
        "POST",
        &format!("/v1/salons/{SALON}/waitlist"),
        Some(intake_body("0d2a7e6a-57a5-4f3e-9f07-0e1e60761010")),
    )
    .await;
    send_json(
        &app.router,
        "POST",
        &format!("/v1/salons/{SALON}/cancellations"),
        Some(cancellation_body()),
    )
    .await;

    let token = extract_token(&app.sms.sent()[0].1);
    let (status, body) = send_json(
        &app.router,
        "GET",
        &format!("/v1/salons/{SALON}/claim?action=decline&token={token}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "declined");
    assert_eq!(body["requeued"], true);
    assert!(body["cooldown_until"].is_string());

    // The entry is back in `waiting` but cooling down, so the very next
    // cancellation for the same slot matches nobody.
    let (_, body) = send_json(
        &app.router,
        "POST",
        &format!("/v1/salons/{SALON}/cancellations"),
        Some(cancellation_body()),
    )
    .await;
    assert_eq!(body["notified"], false);
}

#[tokio::test]
async fn unknown_token_and_bad_action_are_rejected() {
    let app = app().await;

    let (status, body) = send_json(
        &app.router,
        "GET",
        &format!("/v1/salons/{SALON}/claim?action=accept&token=bogus"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send_json(
        &app.router,
        "GET",
        &format!("/v1/salons/{SALON}/claim?action=maybe&token=bogus"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn invalid_intake_is_rejected_with_details() {
    let app = app().await;

    let mut body = intake_body("0d2a7e6a-57a5-4f3e-9f07-0e1e60761011");
    body["email"] = serde_json::Value::Null;
    body["phone"] = serde_json::Value::Null;

    let (status, response) = send_json(
        &app.router,
        "POST",
        &format!("/v1/salons/{SALON}/waitlist"),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        response["error"]
            .as_str()
            .unwrap()
            .contains("email or phone")
    );
}

#[tokio::test]
async fn healthz_responds() {
    let app = app().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
