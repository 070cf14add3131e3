use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tracing::info;

use campus_db::Store;
use campus_types::api::{ADMIN_AUDIENCE, AdminClaims, LoginResponse};
use campus_types::validation::validate_login;

use crate::error::{ApiError, json_body, run_blocking};
use crate::mail::Mailer;
use crate::password::verify_password;
use crate::tokens::PasswordResets;

/// Lifetime of an admin session token.
pub const ADMIN_SESSION_HOURS: i64 = 12;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<dyn Store>,
    pub resets: PasswordResets,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        jwt_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let jwt_secret = jwt_secret.into();
        Self {
            resets: PasswordResets::new(store.clone(), mailer, &jwt_secret, base_url),
            store,
            jwt_secret,
        }
    }
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let req = validate_login(&json_body(payload)?)?;

    let store = state.store.clone();
    let user = run_blocking(move || {
        let user = store.get_user_by_username(&req.username)?;
        Ok(user.filter(|u| verify_password(&req.password, &u.password_hash)))
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;

    let token = create_token(&state.jwt_secret, user.id, &user.username)?;
    info!(user_id = user.id, "Admin logged in");

    Ok(Json(LoginResponse {
        token,
        username: user.username,
    }))
}

pub fn create_token(secret: &str, user_id: i64, username: &str) -> anyhow::Result<String> {
    let claims = AdminClaims {
        sub: user_id,
        username: username.to_string(),
        aud: ADMIN_AUDIENCE.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(ADMIN_SESSION_HOURS)).timestamp()
            as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
