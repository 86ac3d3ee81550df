//! Verification service: owns the intake queue, the job registry and the
//! worker lifecycle.
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::models::email::{EmailPayload, QueuedPayload};
use crate::models::job::{JobEvent, JobId, JobStatus};
use crate::services::intake_queue::{IntakeQueue, QueueItem};
use crate::services::job_registry::JobRegistry;
use crate::services::verification_worker::VerificationWorker;

pub struct VerificationService {
    pool: SqlitePool,
    queue: Arc<IntakeQueue>,
    registry: Arc<JobRegistry>,
    stop_timeout: Duration,
    // Held across the whole of start/stop so lifecycle calls never overlap.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl VerificationService {
    /// The pool is handed to the worker; request handlers never touch it.
    pub fn new(pool: SqlitePool, stop_timeout: Duration) -> Self {
        Self {
            pool,
            queue: Arc::new(IntakeQueue::new()),
            registry: Arc::new(JobRegistry::new()),
            stop_timeout,
            worker: Mutex::new(None),
        }
    }

    /// Spawns the worker. No-op when one is already running.
    pub async fn start(&self) {
        let mut worker = self.worker.lock().await;
        if worker.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let task = VerificationWorker::new(self.pool.clone(), self.queue.clone(), self.registry.clone());
        *worker = Some(tokio::spawn(task.run()));
    }

    /// Asks the worker to exit after its current payload and waits up to the
    /// configured timeout. No-op when nothing is running.
    ///
    /// Items still queued stay queued and are picked up by the next `start`.
    pub async fn stop(&self) {
        let mut worker = self.worker.lock().await;
        let Some(mut handle) = worker.take() else {
            return;
        };
        if handle.is_finished() {
            return;
        }

        self.queue.push_shutdown();
        match tokio::time::timeout(self.stop_timeout, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "email verification worker task failed"),
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.stop_timeout.as_secs_f64(),
                    "email verification worker did not stop in time; it will exit after its current payload"
                );
                // Keep the handle so a later start() does not spawn a second consumer.
                *worker = Some(handle);
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Registers the job as queued, then hands the payload to the worker.
    /// The returned id is resolvable by `get_result` immediately.
    pub fn enqueue(&self, payload: EmailPayload) -> JobId {
        let job_id = JobId::generate();
        self.registry.put(&job_id, JobStatus::queued());
        self.queue.push(QueueItem::Job(QueuedPayload {
            job_id: job_id.clone(),
            payload,
        }));
        job_id
    }

    pub fn get_result(&self, job_id: &str) -> Option<JobStatus> {
        self.registry.get(job_id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.registry.subscribe()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobState;
    use crate::test_utils::{memory_pool, started_service, wait_for_terminal};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn payload(value: Value) -> EmailPayload {
        EmailPayload::from_value(value).unwrap()
    }

    fn valid(email_id: &str) -> EmailPayload {
        payload(json!({
            "email_id": email_id,
            "user": "bob@example.com",
            "body": "You have a new message..."
        }))
    }

    #[tokio::test]
    async fn enqueued_job_is_immediately_resolvable() {
        // Worker not started: the job must still be visible as queued.
        let service = VerificationService::new(memory_pool().await, Duration::from_secs(1));
        let id = service.enqueue(valid("1"));

        let status = service.get_result(id.as_str()).unwrap();
        assert_eq!(status.status, JobState::Queued);
        assert_eq!(status.http_status, 202);
        assert_eq!(service.queued_len(), 1);
    }

    #[tokio::test]
    async fn resubmission_resolves_to_duplicate_of_original() {
        let service = started_service().await;

        let first = service.enqueue(valid("2345"));
        let first = wait_for_terminal(&service, &first).await;
        assert_eq!(first.status, JobState::Completed);

        let second = service.enqueue(valid("2345"));
        let second = wait_for_terminal(&service, &second).await;
        assert_eq!(second.status, JobState::Duplicate);
        assert_eq!(second.record_id, first.record_id);

        service.stop().await;
    }

    #[tokio::test]
    async fn concurrent_submissions_of_one_id_store_exactly_once() {
        let service = started_service().await;

        let producers: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.enqueue(valid("4567")) })
            })
            .collect();
        let mut ids = Vec::new();
        for p in producers {
            ids.push(p.await.unwrap());
        }

        let mut counts: HashMap<JobState, usize> = HashMap::new();
        let mut record_ids = Vec::new();
        for id in &ids {
            let status = wait_for_terminal(&service, id).await;
            *counts.entry(status.status).or_default() += 1;
            record_ids.push(status.record_id);
        }

        assert_eq!(counts.get(&JobState::Completed), Some(&1));
        assert_eq!(counts.get(&JobState::Duplicate), Some(&19));
        assert!(record_ids.windows(2).all(|w| w[0] == w[1]));

        service.stop().await;
    }

    #[tokio::test]
    async fn missing_body_fails_regardless_of_position() {
        let service = started_service().await;

        let before = service.enqueue(valid("a"));
        let broken = service.enqueue(payload(json!({"email_id": "b", "user": "x@example.com"})));
        let after = service.enqueue(valid("c"));

        let status = wait_for_terminal(&service, &broken).await;
        assert_eq!(status.status, JobState::Failed);
        assert!(status.message.unwrap().contains("body"));
        assert_eq!(wait_for_terminal(&service, &before).await.status, JobState::Completed);
        assert_eq!(wait_for_terminal(&service, &after).await.status, JobState::Completed);

        service.stop().await;
    }

    #[tokio::test]
    async fn terminal_status_is_stable_across_polls() {
        let service = started_service().await;
        let id = service.enqueue(valid("stable"));
        let terminal = wait_for_terminal(&service, &id).await;

        for _ in 0..10 {
            assert_eq!(service.get_result(id.as_str()), Some(terminal.clone()));
        }

        service.stop().await;
    }

    #[tokio::test]
    async fn jobs_are_processed_in_submission_order() {
        let service = Arc::new(VerificationService::new(
            memory_pool().await,
            Duration::from_secs(5),
        ));
        let mut events = service.subscribe();

        let a = service.enqueue(valid("A"));
        let b = service.enqueue(valid("B"));
        service.start().await;
        wait_for_terminal(&service, &b).await;

        let mut order = Vec::new();
        while let Ok(event) = events.try_recv() {
            order.push((event.job_id, event.status.status));
        }
        let position = |id: &JobId, state: JobState| {
            order
                .iter()
                .position(|(j, s)| j == id && *s == state)
                .unwrap_or_else(|| panic!("no {state} event for {id}"))
        };

        assert!(position(&a, JobState::Completed) < position(&b, JobState::Processing));
        assert!(position(&a, JobState::Processing) < position(&b, JobState::Processing));

        service.stop().await;
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let service = VerificationService::new(memory_pool().await, Duration::from_secs(5));

        service.stop().await;
        assert!(!service.is_running().await);

        service.start().await;
        service.start().await;
        assert!(service.is_running().await);

        service.stop().await;
        service.stop().await;
        assert!(!service.is_running().await);
    }

    #[tokio::test]
    async fn restart_resumes_items_queued_while_stopped() {
        let service = started_service().await;
        service.stop().await;

        let id = service.enqueue(valid("later"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(service.get_result(id.as_str()).unwrap().status, JobState::Queued);

        service.start().await;
        assert_eq!(wait_for_terminal(&service, &id).await.status, JobState::Completed);

        service.stop().await;
    }

    #[tokio::test]
    async fn stop_leaves_backlog_queued() {
        let service = VerificationService::new(memory_pool().await, Duration::from_secs(5));
        let ids: Vec<JobId> = (0..300).map(|i| service.enqueue(valid(&i.to_string()))).collect();

        service.start().await;
        tokio::task::yield_now().await;
        service.stop().await;
        assert!(!service.is_running().await);

        let states: Vec<JobState> = ids
            .iter()
            .map(|id| service.get_result(id.as_str()).unwrap().status)
            .collect();
        let still_queued = states.iter().filter(|s| **s == JobState::Queued).count();
        assert!(still_queued > 0, "stop() ran the whole backlog");
        assert_eq!(service.queued_len(), still_queued);
        assert!(states.iter().all(|s| *s == JobState::Queued || s.is_terminal()));
        // Everything queued before the marker keeps its submission order.
        let first_queued = states.iter().position(|s| *s == JobState::Queued).unwrap();
        assert!(states[first_queued..].iter().all(|s| *s == JobState::Queued));

        service.start().await;
        for id in &ids {
            assert_eq!(wait_for_terminal(&service, id).await.status, JobState::Completed);
        }
        service.stop().await;
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let service = started_service().await;
        assert!(service.get_result("does-not-exist").is_none());
        service.stop().await;
    }
}
