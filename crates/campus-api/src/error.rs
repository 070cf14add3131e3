use axum::{
    Json,
    extract::{
        Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use campus_types::validation::{FieldError, ValidationError};

/// Everything a handler can fail with. Client-correctable failures carry
/// just enough detail to fix the request; internal ones are logged and
/// collapsed to a generic 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// Missing, expired, forged or already used reset token. The cause is
    /// never told apart for the caller.
    #[error("malformed request parameters: {0}")]
    MalformedParams(String),

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("token is required")]
    MissingToken,

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::MalformedBody(_)
            | Self::MalformedParams(_)
            | Self::InvalidToken
            | Self::MissingToken => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Join(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation error",
            Self::MalformedBody(_) => "Invalid request body",
            Self::MalformedParams(_) => "Invalid request parameters",
            Self::InvalidToken => "Invalid or expired token",
            Self::MissingToken => "Token is required",
            Self::Unauthorized => "Unauthorized",
            Self::NotFound => "Not found",
            Self::Join(_) | Self::Internal(_) => "Internal server error",
        }
    }

    fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, status = status.as_u16(), "Server error occurred");
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(error = %self, "Authentication failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Client error occurred");
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let errors = match &self {
            Self::Validation(e) => Some(e.errors.as_slice()),
            _ => None,
        };
        let body = ErrorBody {
            message: self.user_message(),
            errors,
        };

        (self.status_code(), Json(body)).into_response()
    }
}

/// Unwraps a JSON body, turning syntax and content-type problems into a 400.
pub fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))
}

pub fn path_param<T>(param: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    param
        .map(|Path(value)| value)
        .map_err(|rejection| ApiError::MalformedParams(rejection.body_text()))
}

pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::MalformedParams(rejection.body_text()))
}

/// Runs blocking work (SQLite, Argon2, SMTP) off the async runtime.
pub async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation(ValidationError::default()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::InvalidToken.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::MalformedParams("bad id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("disk on fire")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::Internal(anyhow::anyhow!("smtp password rejected"));
        let body = serde_json::to_value(ErrorBody {
            message: err.user_message(),
            errors: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "message": "Internal server error" }));
    }
}
