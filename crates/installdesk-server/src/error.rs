//! Error types for the HTTP API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use installdesk_core::{AccessError, ValidationErrors};
use installdesk_runtime::RuntimeError;
use installdesk_store::PersistenceError;
use serde_json::json;
use thiserror::Error;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more fields failed validation.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// Missing, expired or unknown session token.
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(#[from] AccessError),

    /// Row missing or outside the caller's scope.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// A constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PersistenceError::Forbidden(access) => ApiError::Forbidden(access),
            PersistenceError::Constraint(msg) => ApiError::Conflict(msg),
            PersistenceError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Validation(errors) => ApiError::Validation(errors),
            RuntimeError::Persistence(err) => err.into(),
            RuntimeError::Token(_) | RuntimeError::SignedOut => ApiError::Unauthenticated,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(fields) => json!({
                "success": false,
                "error": "validation failed",
                "fields": fields,
            }),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                json!({ "success": false, "error": "internal server error" })
            }
            other => json!({ "success": false, "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
