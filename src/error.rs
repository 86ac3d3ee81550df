//! Errors surfaced synchronously at the HTTP boundary.
//!
//! Everything that happens after a payload is accepted is reported through
//! the job status instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Body missing, not JSON, or not a JSON object.
    #[error("Invalid or missing JSON payload")]
    InvalidPayload,

    /// The verification service was never initialised.
    #[error("Verification service unavailable")]
    ServiceUnavailable,

    #[error("Unknown job id")]
    UnknownJob,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UnknownJob => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::ServiceUnavailable) {
            tracing::error!("email verification service not configured");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
