use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://emails.db";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 5;

/// Settings for the verification service binary.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub worker_stop_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let port = parse_var(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);
        let stop_secs = parse_var(&lookup, "WORKER_STOP_TIMEOUT_SECS")?.unwrap_or(DEFAULT_STOP_TIMEOUT_SECS);

        Ok(Config {
            database_url,
            port,
            worker_stop_timeout: Duration::from_secs(stop_secs),
        })
    }
}

/// Settings for the `email-generator` binary.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub verify_url: String,
    /// Contains a `{job_id}` placeholder. Polling is disabled when unset.
    pub status_url_template: Option<String>,
    pub interval: Duration,
}

impl GeneratorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let verify_url = lookup("VERIFY_URL")
            .unwrap_or_else(|| format!("http://localhost:{DEFAULT_PORT}/emails/create"));
        let status_url_template = lookup("STATUS_URL_TEMPLATE").filter(|t| !t.is_empty());
        let interval = parse_var(&lookup, "GEN_INTERVAL")?.unwrap_or(5u64);

        Ok(GeneratorConfig {
            verify_url,
            status_url_template,
            interval: Duration::from_secs(interval),
        })
    }

    pub fn status_url(&self, job_id: &str) -> Option<String> {
        self.status_url_template
            .as_ref()
            .map(|t| t.replace("{job_id}", job_id))
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a number, got {raw:?}"))
        })
        .transpose()
}
