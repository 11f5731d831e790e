//! Error types for mrp-wr
//!
//! Per-row problems never reach this type; they are reported inside the row
//! results. Only request-level failures become an HTTP error.

use crate::batch::BatchError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Batch larger than the configured maximum (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Commit would exceed the user's plan (403)
    #[error("Plan limit exceeded: {0}")]
    PlanLimitExceeded(String),

    /// Request abandoned during shutdown (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// mrp-common error
    #[error("Common error: {0}")]
    Common(#[from] mrp_common::Error),
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::TooManyRows { .. } => ApiError::PayloadTooLarge(err.to_string()),
            BatchError::PlanLimitExceeded { .. } => ApiError::PlanLimitExceeded(err.to_string()),
            BatchError::Cancelled => ApiError::Unavailable(err.to_string()),
            BatchError::Store(e) => ApiError::Common(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg),
            ApiError::PlanLimitExceeded(msg) => (StatusCode::FORBIDDEN, "PLAN_LIMIT_EXCEEDED", msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
