//! Email intake and job status endpoints
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;
use crate::models::email::EmailPayload;
use crate::models::job::{JobState, JobStatus};

#[derive(Debug, Serialize)]
pub struct CreateEmailResponse {
    pub job_id: String,
    pub status: JobState,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse<'a> {
    pub job_id: &'a str,
    #[serde(flatten)]
    pub status: &'a JobStatus,
}

/// POST /emails/create - accept an event for asynchronous verification.
///
/// Only the shape of the body is checked here; field validation happens in
/// the worker and is reported through the status endpoint.
pub async fn create_email(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let payload = serde_json::from_slice(&body)
        .ok()
        .and_then(EmailPayload::from_value)
        .ok_or(ApiError::InvalidPayload)?;

    let service = state.service()?;
    let job_id = service.enqueue(payload);
    tracing::debug!(job_id = %job_id, "email payload queued");

    let resp = CreateEmailResponse {
        job_id: job_id.to_string(),
        status: JobState::Queued,
    };
    Ok((StatusCode::ACCEPTED, Json(resp)).into_response())
}

/// GET /emails/status/:job_id - current status, with the job's HTTP hint as
/// the response status.
pub async fn email_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let service = state.service()?;
    let status = service.get_result(&job_id).ok_or(ApiError::UnknownJob)?;

    let code = StatusCode::from_u16(status.http_status).unwrap_or(StatusCode::OK);
    let body = JobStatusResponse {
        job_id: &job_id,
        status: &status,
    };
    Ok((code, Json(body)).into_response())
}
