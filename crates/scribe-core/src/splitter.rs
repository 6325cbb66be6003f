//! Turning a source recording into ordered segment files.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Produces the segments of one source file.
#[async_trait]
pub trait AudioSplitter: Send + Sync {
    /// Segment file paths in playback order.
    async fn split(&self, source: &Path) -> Result<Vec<PathBuf>>;

    async fn duration_secs(&self, source: &Path) -> Result<f64>;
}

/// Serves recordings that were already cut: `source` is a directory whose
/// files are the segments, ordered by the last number in each file name.
#[derive(Debug, Clone)]
pub struct DirectorySplitter {
    segment_secs: u64,
}

impl DirectorySplitter {
    pub fn new(segment_secs: u64) -> Self {
        Self { segment_secs }
    }

    fn list(source: &Path) -> Result<Vec<PathBuf>> {
        let number = Regex::new(r"(\d+)")?;
        let mut files: Vec<(Option<u64>, String, PathBuf)> = Vec::new();
        let entries = std::fs::read_dir(source)
            .with_context(|| format!("read segment dir: {}", source.display()))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let stem = Path::new(&name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let n = number
                .find_iter(&stem)
                .last()
                .and_then(|m| m.as_str().parse().ok());
            files.push((n, name, entry.path()));
        }
        // Unnumbered files sort after numbered ones, then by name.
        files.sort_by(|a, b| {
            let ka = (a.0.is_none(), a.0, &a.1);
            let kb = (b.0.is_none(), b.0, &b.1);
            ka.cmp(&kb)
        });
        Ok(files.into_iter().map(|(_, _, p)| p).collect())
    }
}

#[async_trait]
impl AudioSplitter for DirectorySplitter {
    async fn split(&self, source: &Path) -> Result<Vec<PathBuf>> {
        let source = source.to_path_buf();
        tokio::task::spawn_blocking(move || Self::list(&source)).await?
    }

    async fn duration_secs(&self, source: &Path) -> Result<f64> {
        let count = self.split(source).await?.len();
        Ok((count as u64 * self.segment_secs) as f64)
    }
}
