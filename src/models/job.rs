//! Job tracking models for the verification pipeline
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::models::email::Validation;

/// Opaque job token handed back to callers on acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Duplicate,
    Failed,
    Error,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Duplicate => "duplicate",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }

    /// Terminal states never change once written.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Processing)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a job as seen by pollers.
///
/// `http_status` is a hint for the HTTP layer and is not part of the
/// serialized body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub status: JobState,
    #[serde(skip)]
    pub http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<i64>,
}

impl JobStatus {
    fn new(status: JobState, http_status: u16) -> Self {
        Self {
            status,
            http_status,
            message: None,
            record_id: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn queued() -> Self {
        Self::new(JobState::Queued, 202)
    }

    pub fn processing() -> Self {
        Self::new(JobState::Processing, 202)
    }

    pub fn completed(record_id: i64) -> Self {
        Self {
            record_id: Some(record_id),
            ..Self::new(JobState::Completed, 201).with_message("Email stored")
        }
    }

    /// `existing` is the record that already holds the external id, when it
    /// could be read back.
    pub fn duplicate(existing: Option<i64>) -> Self {
        Self {
            record_id: existing,
            ..Self::new(JobState::Duplicate, 409).with_message("Email already stored")
        }
    }

    pub fn failed(missing: &[&str]) -> Self {
        Self::new(JobState::Failed, 400).with_message(Validation::rejection_message(missing))
    }

    pub fn error() -> Self {
        Self::new(JobState::Error, 500).with_message("Internal verification error")
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Published on every registry write.
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub job_id: JobId,
    #[serde(flatten)]
    pub status: JobStatus,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_outcomes_are_terminal() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Processing.is_terminal());
        for state in [
            JobState::Completed,
            JobState::Duplicate,
            JobState::Failed,
            JobState::Error,
        ] {
            assert!(state.is_terminal(), "{state} should be terminal");
        }
    }

    #[test]
    fn http_hints_match_outcomes() {
        assert_eq!(JobStatus::queued().http_status, 202);
        assert_eq!(JobStatus::processing().http_status, 202);
        assert_eq!(JobStatus::completed(1).http_status, 201);
        assert_eq!(JobStatus::duplicate(Some(1)).http_status, 409);
        assert_eq!(JobStatus::failed(&["body"]).http_status, 400);
        assert_eq!(JobStatus::error().http_status, 500);
    }

    #[test]
    fn serialized_status_omits_http_hint_and_empty_fields() {
        let body = serde_json::to_value(JobStatus::queued()).unwrap();
        assert_eq!(body, json!({"status": "queued"}));

        let body = serde_json::to_value(JobStatus::completed(7)).unwrap();
        assert_eq!(
            body,
            json!({"status": "completed", "message": "Email stored", "record_id": 7})
        );
    }

    #[test]
    fn failed_status_names_missing_fields() {
        let status = JobStatus::failed(&["user", "body"]);
        assert_eq!(
            status.message.as_deref(),
            Some("Missing required fields: user, body")
        );
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_str());
    }
}
