//! Shared helpers for unit tests.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::models::job::JobStatus;
use crate::services::verification_service::VerificationService;

/// Fresh in-memory store with the schema applied.
pub async fn memory_pool() -> SqlitePool {
    let pool = crate::db::connect("sqlite::memory:").await.unwrap();
    crate::db::create_schema(&pool).await.unwrap();
    pool
}

/// A started service over a fresh in-memory store.
pub async fn started_service() -> Arc<VerificationService> {
    let service = Arc::new(VerificationService::new(
        memory_pool().await,
        Duration::from_secs(5),
    ));
    service.start().await;
    service
}

/// Polls until the job reaches a terminal status. Panics after five seconds.
pub async fn wait_for_terminal(service: &VerificationService, job_id: impl AsRef<str>) -> JobStatus {
    let job_id = job_id.as_ref();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = service
            .get_result(job_id)
            .unwrap_or_else(|| panic!("job {job_id} is not registered"));
        if status.is_terminal() {
            return status;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} still {} after 5s",
            status.status
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
