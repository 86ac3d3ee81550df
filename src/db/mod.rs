use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

pub mod emails;

const CREATE_EMAILS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS emails (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT    NOT NULL UNIQUE, -- up to 64 chars
    sender      TEXT    NOT NULL,        -- up to 120 chars
    subject     TEXT,                    -- up to 255 chars
    body        TEXT    NOT NULL,
    state       TEXT    NOT NULL DEFAULT 'pending',
    created_at  INTEGER NOT NULL
)"#;

/// Opens the store. File-backed databases (and their parent directory) are
/// created when missing.
///
/// The pool holds a single connection: the verification worker is the only
/// writer, and an in-memory database only lives as long as its connection.
pub async fn connect(raw_url: &str) -> Result<SqlitePool> {
    let db_url = normalize_sqlite_url(raw_url);

    if let Some(path) = db_file_path(&db_url) {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }
    }

    let options = SqliteConnectOptions::from_str(&db_url)
        .with_context(|| format!("invalid database url {db_url}"))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(options)
        .await
        .with_context(|| format!("opening database {db_url}"))?;

    Ok(pool)
}

/// Create-on-boot schema; there are no migrations.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_EMAILS_TABLE).execute(pool).await?;
    Ok(())
}

pub fn normalize_sqlite_url(input: &str) -> String {
    // Accept forms: sqlite:foo.db (fix), sqlite://foo.db (ok), file:foo.db (convert), just path (prepend)
    if input.starts_with("sqlite://") || input.starts_with("sqlite::memory:") {
        return input.to_string();
    }
    if let Some(rest) = input.strip_prefix("sqlite:") {
        return format!("sqlite://{}", rest.trim_start_matches('/'));
    }
    if let Some(rest) = input.strip_prefix("file:") {
        return format!("sqlite://{rest}");
    }
    format!("sqlite://{input}")
}

fn db_file_path(url: &str) -> Option<std::path::PathBuf> {
    let rest = url.strip_prefix("sqlite://")?;
    let rest = rest.split('?').next().unwrap_or(rest);
    if rest.is_empty() || rest == ":memory:" {
        return None;
    }
    Some(std::path::PathBuf::from(rest))
}

pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
