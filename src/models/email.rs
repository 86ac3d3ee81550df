//! Email event models: stored records and the payloads that produce them
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::job::JobId;

pub const DEFAULT_STATE: &str = "pending";

/// Required keys, in the order they are reported when missing.
pub const REQUIRED_FIELDS: [&str; 3] = ["email_id", "user", "body"];

/// A stored email event. `external_id` is unique across the table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct EmailRecord {
    pub id: i64,
    pub external_id: String,
    pub sender: String,
    pub subject: Option<String>,
    pub body: String,
    pub state: String,
    pub created_at: i64, // unix seconds
}

/// A validated event ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmail {
    pub external_id: String,
    pub sender: String,
    pub subject: Option<String>,
    pub body: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Validated(NewEmail),
    Rejected { missing: Vec<&'static str> },
}

impl Validation {
    pub fn rejection_message(missing: &[&str]) -> String {
        format!("Missing required fields: {}", missing.join(", "))
    }
}

/// Raw event body as submitted over HTTP. Only guaranteed to be a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailPayload(Map<String, Value>);

impl EmailPayload {
    /// Returns `None` unless the value is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Checks the required keys and normalises the optional ones.
    ///
    /// A field counts as missing when it is absent, `null`, an empty string,
    /// or not representable as text. `email_id` may be a JSON number, in which
    /// case its decimal form is used.
    pub fn validate(&self) -> Validation {
        let external_id = self.text_field("email_id");
        let sender = self.text_field("user");
        let body = self.text_field("body");

        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .zip([&external_id, &sender, &body])
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();

        match (external_id, sender, body) {
            (Some(external_id), Some(sender), Some(body)) => Validation::Validated(NewEmail {
                external_id,
                sender,
                subject: self.text_field("subject"),
                body,
                state: self
                    .text_field("state")
                    .unwrap_or_else(|| DEFAULT_STATE.to_string()),
            }),
            _ => Validation::Rejected { missing },
        }
    }

    fn text_field(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if key == "email_id" => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A payload waiting in the intake queue together with its job id.
#[derive(Debug, Clone)]
pub struct QueuedPayload {
    pub job_id: JobId,
    pub payload: EmailPayload,
}
