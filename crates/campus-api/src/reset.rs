use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Deserialize;
use serde_json::Value;

use campus_types::api::MessageResponse;
use campus_types::validation::{validate_reset_completion, validate_reset_request};

use crate::auth::AppState;
use crate::error::{ApiError, json_body, query_params, run_blocking};

/// Same text whether or not the email belongs to an account.
pub const REQUEST_ACCEPTED: &str =
    "If an account with that email exists, a password reset link has been sent";

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub token: Option<String>,
}

/// POST /api/reset-password/request
pub async fn request(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = validate_reset_request(&json_body(payload)?)?;

    let app = state.clone();
    // Issued::Sent and Issued::UnknownEmail get the same answer.
    run_blocking(move || app.resets.issue(&req.email)).await?;

    Ok(Json(MessageResponse::new(REQUEST_ACCEPTED)))
}

/// POST /api/reset-password/reset
pub async fn reset(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    // Password confirmation is checked here, before the token is looked at.
    let req = validate_reset_completion(&json_body(payload)?)?;

    let app = state.clone();
    let changed = run_blocking(move || app.resets.complete(&req.token, &req.password)).await?;
    if !changed {
        return Err(ApiError::InvalidToken);
    }

    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}

/// GET /api/reset-password/validate?token=...
pub async fn validate(
    State(state): State<AppState>,
    query: Result<Query<ValidateQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = query_params(query)?
        .token
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingToken)?;

    let app = state.clone();
    run_blocking(move || app.resets.validate(&token))
        .await?
        .ok_or(ApiError::InvalidToken)?;

    Ok(Json(MessageResponse::new("Token is valid")))
}
