use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::auth::{self, AppState};
use crate::middleware::require_admin;
use crate::{contact, reset};

/// Every API route, with the admin-only ones behind `require_admin`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/contact", post(contact::submit))
        .route("/api/admin/login", post(auth::login))
        .route("/api/reset-password/request", post(reset::request))
        .route("/api/reset-password/reset", post(reset::reset))
        .route("/api/reset-password/validate", get(reset::validate))
        .route("/health", get(health));

    let admin_routes = Router::new()
        .route("/api/contact", get(contact::list))
        .route("/api/contact/{id}", get(contact::get))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    public_routes.merge(admin_routes).with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
