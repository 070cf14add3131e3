use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::info;

use campus_types::api::ContactCreatedResponse;
use campus_types::models::ContactSubmission;
use campus_types::validation::validate_contact;

use crate::auth::AppState;
use crate::error::{ApiError, json_body, path_param, run_blocking};

/// POST /api/contact — validates the form and stores it.
pub async fn submit(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = validate_contact(&json_body(payload)?)?;

    let store = state.store.clone();
    let submission = run_blocking(move || store.create_contact(contact)).await?;
    info!("New contact submission stored with ID: {}", submission.id);

    Ok((
        StatusCode::CREATED,
        Json(ContactCreatedResponse {
            message: "Contact form submitted successfully".to_string(),
            id: submission.id,
        }),
    ))
}

/// GET /api/contact — admin only, newest first.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ContactSubmission>>, ApiError> {
    let store = state.store.clone();
    let submissions = run_blocking(move || store.list_contacts()).await?;
    Ok(Json(submissions))
}

/// GET /api/contact/{id} — admin only.
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ContactSubmission>, ApiError> {
    let id = path_param(id)?;
    let store = state.store.clone();
    run_blocking(move || store.get_contact(id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}
