use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// Audience of the admin session JWT.
pub const ADMIN_AUDIENCE: &str = "admin";

/// Audience of the password-reset bearer token.
pub const RESET_AUDIENCE: &str = "password-reset";

/// Claims of the admin session token. Shared by the login handler that
/// issues it and the middleware that checks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: i64,
    pub username: String,
    pub aud: String,
    pub exp: usize,
}

/// Claims of the password-reset bearer token. `reset_token` carries the raw
/// reset secret; the account only stores its digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetClaims {
    pub reset_token: String,
    pub aud: String,
    pub exp: usize,
}

// -- Validated requests --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRequest {
    pub email: String,
}

/// A reset completion whose password already matched its confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetCompletion {
    pub token: String,
    pub password: String,
}

// -- Responses --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactCreatedResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}
