//! `scribe repair` – rebuild manifests from part files on disk.

use anyhow::Result;
use scribe_core::checkpoint::CheckpointStore;
use scribe_core::parts::rebuild_manifests;
use std::path::Path;

pub async fn run_repair(store: &dyn CheckpointStore, output_dir: &Path, part_secs: u64) -> Result<()> {
    let stats = rebuild_manifests(output_dir, store, part_secs).await?;
    println!(
        "Scanned {} directories: {} rebuilt, {} failed, {} skipped (still in progress).",
        stats.total, stats.updated, stats.failed, stats.skipped
    );
    Ok(())
}
