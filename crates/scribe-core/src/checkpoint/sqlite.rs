//! SQLite backend (sqlx).

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::store::CheckpointStore;
use super::types::JobRecord;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Records in table `job_records`, one row per file key, holding the
/// record as JSON.
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    pool: Pool<Sqlite>,
}

impl SqliteCheckpointStore {
    /// Open (or create) `~/.local/state/scribe/checkpoints.db`.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("scribe")?;
        let db_path = xdg_dirs.place_state_file("checkpoints.db")?;
        Self::open_at(db_path).await
    }

    /// Open (or create) the database at `path`. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await
            .with_context(|| format!("open checkpoint db: {}", path.display()))?;
        let store = SqliteCheckpointStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_records (
                file_key TEXT PRIMARY KEY,
                record_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn load(&self, file_key: &str) -> Result<Option<JobRecord>> {
        let row = sqlx::query("SELECT record_json FROM job_records WHERE file_key = ?1")
            .bind(file_key)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let json: String = row.get("record_json");
        let record = serde_json::from_str(&json)
            .with_context(|| format!("parse stored record for {}", file_key))?;
        Ok(Some(record))
    }

    async fn save(&self, file_key: &str, record: &JobRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("serialize record")?;
        sqlx::query(
            r#"
            INSERT INTO job_records (file_key, record_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(file_key) DO UPDATE SET
                record_json = excluded.record_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(file_key)
        .bind(json)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;
        tracing::debug!(file = file_key, "checkpoint saved");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(String, JobRecord)>> {
        let rows = sqlx::query("SELECT file_key, record_json FROM job_records ORDER BY file_key ASC")
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.get("file_key");
            let json: String = row.get("record_json");
            let record = serde_json::from_str(&json)
                .with_context(|| format!("parse stored record for {}", key))?;
            out.push((key, record));
        }
        Ok(out)
    }
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<SqliteCheckpointStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let store = SqliteCheckpointStore { pool };
    store.migrate().await?;
    Ok(store)
}
