//! Background worker: validates queued payloads and commits them to the store
use futures::FutureExt;
use sqlx::SqlitePool;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::emails::{self, InsertOutcome, StoreError};
use crate::models::email::{EmailPayload, NewEmail, QueuedPayload, Validation};
use crate::models::job::{JobId, JobStatus};
use crate::services::intake_queue::{IntakeQueue, QueueItem};
use crate::services::job_registry::JobRegistry;

/// Sole consumer of the intake queue and sole user of the store pool.
///
/// Payloads are handled one at a time in queue order, which serializes every
/// store write made by this process.
pub struct VerificationWorker {
    pool: SqlitePool,
    queue: Arc<IntakeQueue>,
    registry: Arc<JobRegistry>,
}

impl VerificationWorker {
    pub fn new(pool: SqlitePool, queue: Arc<IntakeQueue>, registry: Arc<JobRegistry>) -> Self {
        Self {
            pool,
            queue,
            registry,
        }
    }

    /// Runs until a shutdown marker is popped.
    pub async fn run(self) {
        info!("email verification worker started");
        loop {
            match self.queue.pop().await {
                QueueItem::Shutdown => break,
                QueueItem::Job(item) => self.handle(item).await,
            }
        }
        let dropped = self.queue.drain_shutdown_markers();
        info!(
            extra_markers = dropped,
            pending = self.queue.len(),
            "email verification worker stopped"
        );
    }

    async fn handle(&self, item: QueuedPayload) {
        let QueuedPayload { job_id, payload } = item;
        self.registry.put(&job_id, JobStatus::processing());

        let status = settle(&job_id, self.process_payload(&payload)).await;
        debug!(job_id = %job_id, status = %status.status, record_id = ?status.record_id, "email payload verified");
        self.registry.put(&job_id, status);
    }

    /// Validates one payload and runs the dedup-and-insert protocol.
    /// Never fails: every outcome is a terminal status.
    pub async fn process_payload(&self, payload: &EmailPayload) -> JobStatus {
        let email = match payload.validate() {
            Validation::Validated(email) => email,
            Validation::Rejected { missing } => {
                warn!(missing = %missing.join(", "), "rejecting email payload missing fields");
                return JobStatus::failed(&missing);
            }
        };

        match self.dedup_and_insert(&email).await {
            Ok(status) => status,
            Err(e) => {
                error!(external_id = %email.external_id, error = %e, "unexpected error verifying email payload");
                JobStatus::error()
            }
        }
    }

    async fn dedup_and_insert(&self, email: &NewEmail) -> Result<JobStatus, StoreError> {
        if let Some(existing) = emails::find_id_by_external_id(&self.pool, &email.external_id).await? {
            return Ok(JobStatus::duplicate(Some(existing)));
        }

        match emails::insert_email(&self.pool, email).await? {
            InsertOutcome::Inserted(id) => Ok(JobStatus::completed(id)),
            InsertOutcome::Conflict => {
                // Another writer committed the same external id after our lookup.
                let existing = emails::find_id_by_external_id(&self.pool, &email.external_id).await?;
                if existing.is_none() {
                    warn!(external_id = %email.external_id, "conflicting record not found on re-read");
                }
                Ok(JobStatus::duplicate(existing))
            }
        }
    }
}

/// Turns a panic inside one payload's processing into an `error` status.
async fn settle(job_id: &JobId, processing: impl Future<Output = JobStatus>) -> JobStatus {
    match AssertUnwindSafe(processing).catch_unwind().await {
        Ok(status) => status,
        Err(_) => {
            error!(job_id = %job_id, "panic while verifying email payload");
            JobStatus::error()
        }
    }
}
