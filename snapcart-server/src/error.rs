//! Error types for the HTTP API

use crate::vision::ClassifyError;
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
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Vision service failed to answer (502)
    #[error("Upstream error: {0}")]
    BadGateway(String),

    /// Vision service not reachable or not configured (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// snapcart-common error
    #[error("Common error: {0}")]
    Common(#[from] snapcart_common::Error),
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::InvalidImage(msg) => ApiError::BadRequest(msg),
            ClassifyError::AdapterUnavailable(msg) => ApiError::Unavailable(msg),
            ClassifyError::PrimaryDetectionFailed(msg) => ApiError::BadGateway(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use snapcart_common::Error as CommonError;

        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "DETECTION_FAILED", msg),
            ApiError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CLASSIFIER_UNAVAILABLE",
                msg,
            ),
            ApiError::Common(err) => match err {
                CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                CommonError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
                CommonError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
                other => {
                    tracing::error!("Request failed: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        other.to_string(),
                    )
                }
            },
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
