//! Checkpoint storage, one JSON row per gallery URL.

use anyhow::{Context, Result};
use sqlx::Row;

use super::db::{unix_timestamp, ResumeDb};
use crate::checkpoint::ResumeCheckpoint;

impl ResumeDb {
    pub async fn get_checkpoint(&self, url: &str) -> Result<Option<ResumeCheckpoint>> {
        let row = sqlx::query("SELECT body FROM checkpoints WHERE url = ?1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let body: String = row.get("body");
        let cp = serde_json::from_str(&body)
            .with_context(|| format!("corrupt checkpoint for {}", url))?;
        Ok(Some(cp))
    }

    /// Insert or replace the checkpoint for `cp.url`.
    pub async fn set_checkpoint(&self, cp: &ResumeCheckpoint) -> Result<()> {
        let body = serde_json::to_string(cp)?;
        sqlx::query(
            r#"
            INSERT INTO checkpoints (url, body, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(url) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&cp.url)
        .bind(body)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear_checkpoint(&self, url: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE url = ?1")
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Every stored checkpoint, ordered by URL. Rows that fail to parse are skipped with a warning.
    pub async fn list_checkpoints(&self) -> Result<Vec<ResumeCheckpoint>> {
        let rows = sqlx::query("SELECT url, body FROM checkpoints ORDER BY url ASC")
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let url: String = row.get("url");
            let body: String = row.get("body");
            match serde_json::from_str(&body) {
                Ok(cp) => out.push(cp),
                Err(e) => tracing::warn!(url = %url, "skipping corrupt checkpoint: {}", e),
            }
        }
        Ok(out)
    }
}
