//! Process-state persistence.
//!
//! The transcription stage tracks each external job in the
//! `material_process_pipeline` table, keyed by material URL. Writes are
//! single upserts carrying a complete snapshot, so a redelivered record
//! overwrites the same row instead of creating a duplicate, and a crash
//! between writes leaves the row at its last written stage label.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oerhub_common::models::ProcessState;
use oerhub_common::Result;
use sqlx::{Row, SqlitePool};

/// Narrow persistence contract required by the pipeline.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Insert-or-update the row for `state.url` with a full snapshot.
    async fn upsert(&self, state: &ProcessState) -> Result<()>;

    /// Update the stage label for an existing row; `finished` also stamps
    /// the end time.
    async fn mark_status(&self, url: &str, status: &str, finished: bool) -> Result<()>;

    /// Fetch the current row, if any.
    async fn get(&self, url: &str) -> Result<Option<ProcessState>>;
}

/// SQLite-backed store.
pub struct SqlProcessStore {
    pool: SqlitePool,
}

impl SqlProcessStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessStore for SqlProcessStore {
    async fn upsert(&self, state: &ProcessState) -> Result<()> {
        let manifest = state
            .manifest
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO material_process_pipeline
                (url, status, config, start_process_time, end_process_time, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(url) DO UPDATE SET
                status = excluded.status,
                config = excluded.config,
                start_process_time = excluded.start_process_time,
                end_process_time = excluded.end_process_time,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&state.url)
        .bind(&state.status)
        .bind(manifest)
        .bind(state.start_process_time.map(|t| t.to_rfc3339()))
        .bind(state.end_process_time.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_status(&self, url: &str, status: &str, finished: bool) -> Result<()> {
        let end_time = finished.then(|| Utc::now().to_rfc3339());

        sqlx::query(
            r#"
            UPDATE material_process_pipeline
            SET status = ?,
                end_process_time = COALESCE(?, end_process_time),
                updated_at = CURRENT_TIMESTAMP
            WHERE url = ?
            "#,
        )
        .bind(status)
        .bind(end_time)
        .bind(url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<ProcessState>> {
        let row = sqlx::query(
            r#"
            SELECT url, status, config, start_process_time, end_process_time
            FROM material_process_pipeline
            WHERE url = ?
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let manifest = row
                    .get::<Option<String>, _>("config")
                    .map(|s| serde_json::from_str(&s))
                    .transpose()?;
                Ok(Some(ProcessState {
                    url: row.get("url"),
                    status: row.get("status"),
                    manifest,
                    start_process_time: parse_time(row.get("start_process_time")),
                    end_process_time: parse_time(row.get("end_process_time")),
                }))
            }
            None => Ok(None),
        }
    }
}

fn parse_time(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}
