//! Crash-safe file replacement.
//!
//! Checkpoints, part files and manifests are written to a temp file in the
//! destination directory, synced, then renamed over the target, so a reader
//! sees either the old contents or the new ones.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Atomically replace `path` with `contents`. Creates parent directories.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(contents).context("failed to write temp file")?;
    tmp.as_file().sync_all().context("failed to sync temp file")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// `atomic_write` on the blocking pool, for async callers.
pub async fn atomic_write_async(path: &Path, contents: Vec<u8>) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || atomic_write(&path, &contents))
        .await
        .context("atomic write task failed")?
}
