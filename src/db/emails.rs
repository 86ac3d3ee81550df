//! Store access for email records
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::now_epoch;
use crate::models::email::{EmailRecord, NewEmail};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of an insert attempt. A uniqueness rejection on `external_id` is a
/// normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    Conflict,
}

pub async fn find_id_by_external_id(
    pool: &SqlitePool,
    external_id: &str,
) -> Result<Option<i64>, StoreError> {
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM emails WHERE external_id = ?")
        .bind(external_id)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// Inserts inside a transaction; any failure rolls it back.
pub async fn insert_email(pool: &SqlitePool, email: &NewEmail) -> Result<InsertOutcome, StoreError> {
    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "INSERT INTO emails (external_id, sender, subject, body, state, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&email.external_id)
    .bind(&email.sender)
    .bind(&email.subject)
    .bind(&email.body)
    .bind(&email.state)
    .bind(now_epoch())
    .execute(&mut *tx)
    .await;

    match res {
        Ok(done) => {
            tx.commit().await?;
            Ok(InsertOutcome::Inserted(done.last_insert_rowid()))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tx.rollback().await?;
            Ok(InsertOutcome::Conflict)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback().await {
                tracing::warn!(error = %rb, "rollback after failed insert also failed");
            }
            Err(e.into())
        }
    }
}

pub async fn get_email(pool: &SqlitePool, id: i64) -> Result<Option<EmailRecord>, StoreError> {
    let record = sqlx::query_as::<_, EmailRecord>(
        "SELECT id, external_id, sender, subject, body, state, created_at FROM emails WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}
