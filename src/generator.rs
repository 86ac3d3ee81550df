//! Synthetic event producer used to exercise the intake endpoint.
//!
//! Events are deliberately imperfect: most reuse a small pool of ids so that
//! duplicates are common, and some omit fields so that the worker's
//! validation branch gets traffic.

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::GeneratorConfig;
use crate::models::job::JobState;

const REUSED_IDS: [&str; 3] = ["2345", "3456", "4567"];
const USERS: [&str; 2] = ["bob@example.com", "alice@example.com"];
const SUBJECTS: [&str; 3] = ["Your invoice", "Password reset", "Welcome"];
const BODY: &str = "You have a new message...";

const REUSE_PROBABILITY: f64 = 0.7;
const MALFORMED_PROBABILITY: f64 = 0.2;
const POLL_ATTEMPTS: usize = 10;
const POLL_DELAY: Duration = Duration::from_millis(500);

pub fn generate_email_event<R: Rng>(rng: &mut R) -> Value {
    let email_id = if rng.gen_bool(REUSE_PROBABILITY) {
        REUSED_IDS.choose(rng).copied().unwrap_or(REUSED_IDS[0]).to_string()
    } else {
        rng.gen_range(10_000_000u32..=99_999_999).to_string()
    };
    let user = USERS.choose(rng).copied().unwrap_or(USERS[0]);

    if rng.gen_bool(MALFORMED_PROBABILITY) {
        return json!({ "email_id": email_id, "user": user });
    }

    let subject = SUBJECTS.choose(rng).copied().unwrap_or(SUBJECTS[0]);
    json!({
        "email_id": email_id,
        "user": user,
        "subject": subject,
        "body": BODY,
        "state": "pending",
    })
}

#[derive(Debug, Deserialize)]
struct Accepted {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: JobState,
    #[serde(default)]
    message: Option<String>,
}

/// Posts events forever at the configured interval. Transport failures are
/// logged and the loop carries on.
pub async fn run(config: GeneratorConfig) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    tracing::info!(url = %config.verify_url, interval_secs = config.interval.as_secs(), "email generator started");

    loop {
        let event = generate_email_event(&mut rand::thread_rng());
        if let Err(e) = send_event(&client, &config, &event).await {
            tracing::warn!(error = %e, "failed to send event");
        }
        tokio::time::sleep(config.interval).await;
    }
}

async fn send_event(client: &reqwest::Client, config: &GeneratorConfig, event: &Value) -> Result<()> {
    let resp = client.post(&config.verify_url).json(event).send().await?;
    let code = resp.status();
    tracing::info!(event = %event, status = code.as_u16(), "sent");

    if code != reqwest::StatusCode::ACCEPTED {
        return Ok(());
    }
    let accepted: Accepted = resp.json().await?;
    if let Some(url) = config.status_url(&accepted.job_id) {
        poll_status(client, &url, &accepted.job_id).await?;
    }
    Ok(())
}

async fn poll_status(client: &reqwest::Client, url: &str, job_id: &str) -> Result<()> {
    for _ in 0..POLL_ATTEMPTS {
        let resp = client.get(url).send().await?;
        let code = resp.status();
        let body: StatusBody = resp.json().await?;
        if body.status.is_terminal() {
            tracing::info!(
                job_id,
                status = %body.status,
                http_status = code.as_u16(),
                message = body.message.as_deref().unwrap_or(""),
                "job finished"
            );
            return Ok(());
        }
        tokio::time::sleep(POLL_DELAY).await;
    }
    tracing::warn!(job_id, attempts = POLL_ATTEMPTS, "job still pending after polling");
    Ok(())
}
