use axum::response::IntoResponse;
use axum::{routing::get, routing::post, Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::services::verification_service::VerificationService;

pub mod emails;

/// Handler state. `service` is `None` when the store could not be opened at
/// boot; every `/emails` route then answers 503.
#[derive(Clone)]
pub struct AppState {
    service: Option<Arc<VerificationService>>,
}

impl AppState {
    pub fn new(service: Arc<VerificationService>) -> Self {
        Self {
            service: Some(service),
        }
    }

    pub fn unavailable() -> Self {
        Self { service: None }
    }

    pub fn service(&self) -> Result<&Arc<VerificationService>, ApiError> {
        self.service.as_ref().ok_or(ApiError::ServiceUnavailable)
    }
}

async fn root_page() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Email Notification Deduplication Service"
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_page))
        .route("/healthz", get(|| async { "ok" }))
        .route("/emails/create", post(emails::create_email))
        .route("/emails/status/:job_id", get(emails::email_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
