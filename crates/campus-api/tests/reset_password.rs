mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use campus_db::{Database, Store};
use common::{
    ADMIN_EMAIL, ADMIN_PASSWORD, BrokenMailer, admin_token, app, app_with_mailer, app_with_store,
    error_fields, get, post,
};

async fn request_reset(router: &axum::Router, email: &str) -> (StatusCode, serde_json::Value) {
    post(router, "/api/reset-password/request", json!({ "email": email })).await
}

async fn reset_with(router: &axum::Router, token: &str, password: &str) -> (StatusCode, serde_json::Value) {
    post(
        router,
        "/api/reset-password/reset",
        json!({ "token": token, "password": password, "confirmPassword": password }),
    )
    .await
}

async fn validate(router: &axum::Router, token: &str) -> StatusCode {
    get(router, &format!("/api/reset-password/validate?token={}", token), None)
        .await
        .0
}

#[tokio::test]
async fn unknown_email_looks_exactly_like_a_known_one() {
    let app = app();

    let known = request_reset(&app.router, ADMIN_EMAIL).await;
    let unknown = request_reset(&app.router, "stranger@example.com").await;

    assert_eq!(known.0, StatusCode::OK);
    assert_eq!(known, unknown);
    assert_eq!(app.outbox.count(), 1);
}

#[tokio::test]
async fn request_rejects_bad_email() {
    let app = app();
    let (status, body) = request_reset(&app.router, "not-an-email").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&body), vec!["email"]);
    assert_eq!(app.outbox.count(), 0);
}

#[tokio::test]
async fn full_reset_flow_and_single_use() {
    let app = app();

    request_reset(&app.router, ADMIN_EMAIL).await;
    let token = app.outbox.last_token();
    assert_eq!(validate(&app.router, &token).await, StatusCode::OK);

    let (status, body) = reset_with(&app.router, &token, "fresh-pass").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password has been reset successfully");

    // Used up.
    assert_eq!(validate(&app.router, &token).await, StatusCode::BAD_REQUEST);
    let (status, body) = reset_with(&app.router, &token, "again-pass").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired token");

    assert!(admin_token(&app.router, ADMIN_PASSWORD).await.is_none());
    assert!(admin_token(&app.router, "fresh-pass").await.is_some());
}

#[tokio::test]
async fn newer_token_invalidates_older_one() {
    let app = app();

    request_reset(&app.router, ADMIN_EMAIL).await;
    let first = app.outbox.last_token();
    request_reset(&app.router, ADMIN_EMAIL).await;
    let second = app.outbox.last_token();

    assert_eq!(validate(&app.router, &first).await, StatusCode::BAD_REQUEST);
    assert_eq!(validate(&app.router, &second).await, StatusCode::OK);

    let (status, _) = reset_with(&app.router, &first, "first-pass").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mismatched_confirmation_fails_before_token_check() {
    let app = app();
    let (status, body) = post(
        &app.router,
        "/api/reset-password/reset",
        json!({ "token": "definitely-not-valid", "password": "secret1", "confirmPassword": "secret2" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation error");
    assert_eq!(error_fields(&body), vec!["confirmPassword"]);
}

#[tokio::test]
async fn forged_token_is_rejected_uniformly() {
    let app = app();
    let (status, body) = reset_with(&app.router, "eyJhbGciOiJIUzI1NiJ9.e30.forged", "secret1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Invalid or expired token" }));
    assert!(admin_token(&app.router, ADMIN_PASSWORD).await.is_some());
}

#[tokio::test]
async fn validate_requires_a_token() {
    let app = app();

    let (status, body) = get(&app.router, "/api/reset-password/validate", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Token is required");

    let (status, _) = get(&app.router, "/api/reset-password/validate?token=", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(validate(&app.router, "garbage").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_token_parameter_is_a_json_bad_request() {
    let app = app();

    let (status, body) = get(&app.router, "/api/reset-password/validate?token=a&token=b", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request parameters");
}

#[tokio::test]
async fn delivery_failure_is_an_internal_error() {
    let router = app_with_mailer(Arc::new(BrokenMailer));

    let (status, body) = request_reset(&router, ADMIN_EMAIL).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Internal server error" }));
}

#[tokio::test]
async fn sqlite_store_serves_the_same_flow() {
    let app = app_with_store(Arc::new(Database::open_in_memory().unwrap()));

    request_reset(&app.router, ADMIN_EMAIL).await;
    let token = app.outbox.last_token();

    let (status, _) = reset_with(&app.router, &token, "sqlite-pass").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validate(&app.router, &token).await, StatusCode::BAD_REQUEST);
    assert!(admin_token(&app.router, "sqlite-pass").await.is_some());

    let (status, _) = post(
        &app.router,
        "/api/contact",
        json!({ "name": "Sahan", "email": "sahan@example.com", "subject": "courses", "message": "Which courses start in June?" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.store.list_contacts().unwrap().len(), 1);
}
