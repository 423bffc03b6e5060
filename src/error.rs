use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error surface of the API. Every handler and service returns this; no
/// variant is fatal to the process.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input, user-correctable.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Role, division or ownership mismatch. No partial effect.
    #[error("{0}")]
    Forbidden(String),

    /// A lifecycle transition attempted from the wrong status.
    #[error("{0}")]
    StateConflict(String),

    /// Requested or approved quantity exceeds available stock.
    #[error("{0}")]
    InsufficientStock(String),

    /// Referenced entity does not exist (or is soft-deleted).
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::StateConflict(_) => (StatusCode::CONFLICT, "state_conflict"),
            ApiError::InsufficientStock(_) => (StatusCode::CONFLICT, "insufficient_stock"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Database(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "internal error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = Json(json!({ "error": { "code": code, "message": message } }));
        (status, body).into_response()
    }
}
