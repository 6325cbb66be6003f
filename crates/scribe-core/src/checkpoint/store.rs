use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::types::JobRecord;
use super::{JsonCheckpointStore, SqliteCheckpointStore};
use crate::config::CheckpointBackend;

/// Load and save job records by file key.
///
/// Assumes a single writer per file key.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, file_key: &str) -> Result<Option<JobRecord>>;

    /// Replace the stored record for `file_key`. Durable on return.
    async fn save(&self, file_key: &str, record: &JobRecord) -> Result<()>;

    /// Every stored record, ordered by file key.
    async fn list(&self) -> Result<Vec<(String, JobRecord)>>;
}

/// Open the configured backend at its default location.
pub async fn open_store(backend: CheckpointBackend) -> Result<Arc<dyn CheckpointStore>> {
    Ok(match backend {
        CheckpointBackend::Json => Arc::new(JsonCheckpointStore::open_default()?),
        CheckpointBackend::Sqlite => Arc::new(SqliteCheckpointStore::open_default().await?),
    })
}
