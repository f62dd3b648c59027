//! Error types for raasta-server
//!
//! Domain errors from `raasta-common` map onto HTTP statuses here. Anything that is not
//! a caller mistake is logged in full and reported to the caller only as a generic
//! internal error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use raasta_common::Error as CommonError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unrecognised credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request body could not be read (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Domain error from raasta-common
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Common(CommonError::Validation { field, message }) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message,
                Some(field),
            ),
            ApiError::Common(CommonError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None)
            }
            ApiError::Common(CommonError::StateConflict(msg)) => {
                (StatusCode::CONFLICT, "STATE_CONFLICT", msg, None)
            }
            ApiError::Common(CommonError::Forbidden(msg)) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None)
            }
            ApiError::Common(other) => {
                error!(error = %other, "Request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(json!({
            "status": "error",
            "error": {
                "code": code,
                "message": message,
                "field": field,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
