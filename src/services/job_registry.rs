//! In-memory job status table
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::models::job::{JobEvent, JobId, JobStatus};

const EVENT_CAPACITY: usize = 256;

/// Maps job ids to their latest status. Entries live for the whole process.
///
/// The lock is held only for the map operation itself; event publication
/// happens after it is released and never blocks.
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, JobStatus>>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl JobRegistry {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            jobs: Mutex::new(HashMap::new()),
            event_tx,
        }
    }

    /// Overwrites whatever is stored for `job_id`.
    pub fn put(&self, job_id: &JobId, status: JobStatus) {
        self.lock().insert(job_id.clone(), status.clone());
        // No subscribers is fine.
        let _ = self.event_tx.send(JobEvent {
            job_id: job_id.clone(),
            status,
            timestamp: chrono::Utc::now().timestamp(),
        });
    }

    /// Snapshot copy of the current status.
    pub fn get(&self, job_id: &str) -> Option<JobStatus> {
        self.lock().get(job_id).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, JobStatus>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
