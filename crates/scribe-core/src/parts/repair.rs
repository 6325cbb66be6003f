//! Rebuild manifests from part files on disk.
//!
//! Used when job records are missing or stale. Directories under the output
//! root that contain part files are matched to stored records by where their
//! parts were written; unmatched directories get a reconstructed record.
//! Historical names are accepted: `part_3.txt`, `part3.txt`,
//! `talk_part_3.txt` and `talk_part3.txt`, case-insensitively.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::manifest::write_manifest;
use super::RECONSTRUCTED_PREFIX;
use crate::checkpoint::{CheckpointStore, JobRecord, PartRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairStats {
    /// Directories with part files.
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
    /// Directories whose record still expects more parts than exist.
    pub skipped: usize,
}

fn part_pattern() -> Result<Regex> {
    Ok(Regex::new(r"(?i)^(?:.*_)?part_?(\d+)\.txt$")?)
}

/// A directory and its part files in part order.
#[derive(Debug)]
struct PartDir {
    dir: PathBuf,
    parts: Vec<PathBuf>,
}

/// Order part files by their number; files without a usable number, or
/// whose number repeats, keep their scan position after the numbered ones.
fn order_parts(files: Vec<(String, PathBuf)>, pattern: &Regex) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    let mut keyed: Vec<(u64, usize, PathBuf)> = files
        .into_iter()
        .enumerate()
        .map(|(pos, (name, path))| {
            let number = pattern
                .captures(&name)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .filter(|n| seen.insert(*n));
            (number.unwrap_or(u64::MAX), pos, path)
        })
        .collect();
    keyed.sort_by_key(|(number, pos, _)| (*number, *pos));
    keyed.into_iter().map(|(_, _, p)| p).collect()
}

fn scan(root: &Path, pattern: &Regex) -> Result<Vec<PartDir>> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries =
            std::fs::read_dir(&dir).with_context(|| format!("read dir: {}", dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if pattern.is_match(&name) {
                    files.push((name, path));
                }
            }
        }
        if !files.is_empty() {
            files.sort_by(|a, b| a.0.cmp(&b.0));
            found.push(PartDir {
                parts: order_parts(files, pattern),
                dir,
            });
        }
    }
    found.sort_by(|a, b| a.dir.cmp(&b.dir));
    Ok(found)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Stored record whose parts were written into `dir`.
fn find_record(records: &[(String, JobRecord)], dir: &Path) -> Option<(String, JobRecord)> {
    records
        .iter()
        .find(|(_, rec)| {
            rec.parts
                .values()
                .filter_map(|p| p.output_file.as_deref()?.parent())
                .any(|parent| same_dir(parent, dir))
        })
        .cloned()
}

/// Scan `output_root`, rebuild every manifest, and persist the records.
pub async fn rebuild_manifests(
    output_root: &Path,
    store: &dyn CheckpointStore,
    part_secs: u64,
) -> Result<RepairStats> {
    let mut stats = RepairStats::default();
    if !output_root.is_dir() {
        tracing::warn!(path = %output_root.display(), "output directory does not exist");
        return Ok(stats);
    }
    let pattern = part_pattern()?;
    let root = output_root.to_path_buf();
    let dirs = tokio::task::spawn_blocking(move || scan(&root, &pattern)).await??;
    let records = store.list().await?;
    tracing::info!(directories = dirs.len(), "rebuilding manifests");

    for PartDir { dir, parts } in dirs {
        stats.total += 1;
        let dir_name = dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (key, mut record) = match find_record(&records, &dir) {
            Some((key, rec)) if rec.total_parts > parts.len() => {
                tracing::info!(
                    file = %key,
                    expected = rec.total_parts,
                    found = parts.len(),
                    "job still in progress; leaving it alone"
                );
                stats.skipped += 1;
                continue;
            }
            Some(found) => found,
            None => {
                let rel = dir.strip_prefix(output_root).unwrap_or(&dir);
                let key = format!("{}{}", RECONSTRUCTED_PREFIX, rel.to_string_lossy());
                let rec = JobRecord::new(
                    dir_name.clone(),
                    (parts.len() as u64 * part_secs) as f64,
                    parts.len(),
                );
                (key, rec)
            }
        };

        record.total_parts = parts.len();
        let completed_at = record.last_processed_time.clone();
        for (index, path) in parts.into_iter().enumerate() {
            let part = record.parts.entry(index).or_insert_with(PartRecord::default);
            part.completed = true;
            part.output_file = Some(path);
            if part.completed_at.is_none() {
                part.completed_at = Some(completed_at.clone());
            }
        }
        record.parts.retain(|i, _| *i < record.total_parts);
        record.refresh_completed();

        let written = match write_manifest(&dir, &record, part_secs).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), "manifest rebuild failed: {:#}", e);
                stats.failed += 1;
                continue;
            }
        };
        if let Err(e) = store.save(&key, &record).await {
            tracing::warn!(file = %key, "saving rebuilt record failed: {:#}", e);
            stats.failed += 1;
            continue;
        }
        match written {
            Some(path) => {
                tracing::info!(file = %key, manifest = %path.display(), "manifest rebuilt");
                stats.updated += 1;
            }
            None => stats.failed += 1,
        }
    }
    Ok(stats)
}
