#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::bail;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use campus_api::mail::{Mailer, OutgoingEmail};
use campus_api::password::hash_password;
use campus_api::{AppStateInner, router};
use campus_db::{MemoryStore, NewUser, Store};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// Captures outgoing email so tests can follow the reset link.
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl Outbox {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// The bearer token from the most recent reset link.
    pub fn last_token(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let link = sent
            .last()
            .and_then(|e| e.link.clone())
            .expect("no reset email was sent");
        let (_, token) = link.split_once("token=").expect("link has no token");
        token.to_string()
    }
}

impl Mailer for Outbox {
    fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct BrokenMailer;

impl Mailer for BrokenMailer {
    fn send(&self, _email: &OutgoingEmail) -> anyhow::Result<()> {
        bail!("SMTP server unreachable")
    }
}

pub struct TestApp {
    pub router: Router,
    pub outbox: Arc<Outbox>,
    pub store: Arc<dyn Store>,
}

pub fn app() -> TestApp {
    app_with_store(Arc::new(MemoryStore::new()))
}

pub fn app_with_store(store: Arc<dyn Store>) -> TestApp {
    let outbox = Arc::new(Outbox::default());
    seed_admin(store.as_ref());
    let state = Arc::new(AppStateInner::new(
        store.clone(),
        outbox.clone(),
        JWT_SECRET,
        "http://localhost:5000",
    ));
    TestApp {
        router: router(state),
        outbox,
        store,
    }
}

pub fn app_with_mailer(mailer: Arc<dyn Mailer>) -> Router {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    seed_admin(store.as_ref());
    router(Arc::new(AppStateInner::new(
        store,
        mailer,
        JWT_SECRET,
        "http://localhost:5000",
    )))
}

fn seed_admin(store: &dyn Store) {
    store
        .ensure_user(NewUser {
            username: "admin".into(),
            password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
            email: Some(ADMIN_EMAIL.into()),
        })
        .unwrap();
}

pub async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(router, Method::POST, uri, Some(body), None).await
}

pub async fn get(router: &Router, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
    call(router, Method::GET, uri, None, bearer).await
}

pub async fn admin_token(router: &Router, password: &str) -> Option<String> {
    let (status, body) = post(
        router,
        "/api/admin/login",
        serde_json::json!({ "username": "admin", "password": password }),
    )
    .await;
    if status != StatusCode::OK {
        return None;
    }
    body["token"].as_str().map(str::to_string)
}

pub fn error_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
