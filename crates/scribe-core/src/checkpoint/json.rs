//! Single-document JSON backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::store::CheckpointStore;
use super::types::JobRecord;
use crate::storage::atomic_write_async;

type RecordMap = BTreeMap<String, JobRecord>;

/// All records in one JSON object keyed by file, rewritten through a temp
/// file and rename on every save.
pub struct JsonCheckpointStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `~/.local/state/scribe/checkpoints.json`.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("scribe")?;
        Ok(xdg_dirs.place_state_file("checkpoints.json")?)
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<RecordMap> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RecordMap::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read checkpoints: {}", self.path.display()))
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RecordMap::new());
        }
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse checkpoints: {}", self.path.display()))
    }
}

#[async_trait]
impl CheckpointStore for JsonCheckpointStore {
    async fn load(&self, file_key: &str) -> Result<Option<JobRecord>> {
        Ok(self.read_all().await?.remove(file_key))
    }

    async fn save(&self, file_key: &str, record: &JobRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(file_key.to_string(), record.clone());
        let json = serde_json::to_vec_pretty(&all).context("serialize checkpoints")?;
        atomic_write_async(&self.path, json).await?;
        tracing::debug!(file = file_key, path = %self.path.display(), "checkpoint saved");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(String, JobRecord)>> {
        Ok(self.read_all().await?.into_iter().collect())
    }
}
