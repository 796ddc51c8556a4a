//! Queue entry operations: add, list, get, status, remove.

use anyhow::Result;
use sqlx::Row;

use super::db::{unix_timestamp, ResumeDb};
use crate::state::{JobId, QueueEntry, UrlStatus};

fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> QueueEntry {
    let status: String = row.get("status");
    QueueEntry {
        id: row.get("id"),
        url: row.get("url"),
        status: UrlStatus::from_str(&status),
        reason: row.get("reason"),
    }
}

impl ResumeDb {
    /// Append a pending gallery URL to the queue.
    pub async fn add_job(&self, url: &str) -> Result<JobId> {
        let now = unix_timestamp();
        let row_id = sqlx::query(
            r#"
            INSERT INTO jobs (url, status, reason, created_at, updated_at)
            VALUES (?1, ?2, NULL, ?3, ?4)
            "#,
        )
        .bind(url)
        .bind(UrlStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// Store an entry created by a running queue, keeping its id.
    pub async fn insert_job(&self, entry: &QueueEntry) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            INSERT INTO jobs (id, url, status, reason, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.url)
        .bind(entry.status.as_str())
        .bind(entry.reason.as_deref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All queue entries in queue order (oldest first).
    pub async fn list_jobs(&self) -> Result<Vec<QueueEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, url, status, reason
            FROM jobs
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(entry_from_row).collect())
    }

    pub async fn get_job(&self, id: JobId) -> Result<Option<QueueEntry>> {
        let row = sqlx::query("SELECT id, url, status, reason FROM jobs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(entry_from_row))
    }

    /// Set status and reason. Returns false if the job does not exist.
    pub async fn set_status(
        &self,
        id: JobId,
        status: UrlStatus,
        reason: Option<&str>,
    ) -> Result<bool> {
        let now = unix_timestamp();
        let res = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?1,
                reason = ?2,
                updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(status.as_str())
        .bind(reason)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Reset every `downloading` entry to `pending` (left over from a crashed run).
    pub async fn recover_downloading_jobs(&self) -> Result<u64> {
        let now = unix_timestamp();
        let res = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?1,
                updated_at = ?2
            WHERE status = ?3
            "#,
        )
        .bind(UrlStatus::Pending.as_str())
        .bind(now)
        .bind(UrlStatus::Downloading.as_str())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Delete a queue entry and its checkpoint. Returns false if it did not exist.
    pub async fn remove_job(&self, id: JobId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT url FROM jobs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.commit().await?;
            return Ok(false);
        };
        let url: String = row.get("url");
        sqlx::query("DELETE FROM checkpoints WHERE url = ?1")
            .bind(&url)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM jobs WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }
}
