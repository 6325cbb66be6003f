//! Consolidated manifest for a completed file.

use anyhow::Result;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::checkpoint::JobRecord;
use crate::storage::atomic_write_async;

pub const MANIFEST_NAME: &str = "index.md";

fn minutes(secs: f64) -> f64 {
    secs / 60.0
}

/// Part `index` spans `[index * part_secs, (index + 1) * part_secs)`. The
/// last part runs to the end of the file, which also covers files kept
/// whole because they fall under the split threshold.
fn part_minutes(record: &JobRecord, index: usize, part_secs: u64) -> (f64, f64) {
    let start = (index as u64 * part_secs) as f64;
    let file_end = record.total_duration_secs.max(start);
    let end = if index + 1 >= record.total_parts {
        file_end
    } else {
        (((index as u64 + 1) * part_secs) as f64).min(file_end)
    };
    (minutes(start), minutes(end))
}

/// Manifest text. `read_part` supplies each completed part's content.
pub(super) fn render_manifest<F>(record: &JobRecord, part_secs: u64, mut read_part: F) -> String
where
    F: FnMut(&Path) -> std::io::Result<String>,
{
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", record.filename);
    let _ = writeln!(
        out,
        "- Total duration: {:.1} minutes",
        minutes(record.total_duration_secs)
    );
    let _ = writeln!(out, "- Parts: {}", record.total_parts);
    let _ = writeln!(out, "- Completed: {}", record.last_processed_time);
    let stats = record.aggregate_stats();
    if stats.total > 0 {
        let _ = writeln!(
            out,
            "- Recognition rate: {}/{} segments ({:.1}%)",
            stats.successful,
            stats.total,
            stats.rate()
        );
    }

    let completed: Vec<(usize, &Path)> = (0..record.total_parts)
        .filter_map(|i| {
            let part = record.parts.get(&i)?;
            if !part.completed {
                return None;
            }
            Some((i, part.output_file.as_deref()?))
        })
        .collect();

    out.push_str("\n## Contents\n\n");
    for (i, path) in &completed {
        let (start, end) = part_minutes(record, *i, part_secs);
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "- [Part {}](./{}) - {:.1}-{:.1} min",
            i + 1,
            file,
            start,
            end
        );
    }

    out.push_str("\n## Full text\n");
    for (i, path) in &completed {
        let (start, end) = part_minutes(record, *i, part_secs);
        let _ = writeln!(out, "\n### Part {} ({:.1}-{:.1} min)\n", i + 1, start, end);
        match read_part(path) {
            Ok(text) => {
                out.push_str(text.trim_end());
                out.push('\n');
            }
            Err(e) => {
                let _ = writeln!(out, "[part {} unreadable: {}]", i + 1, e);
            }
        }
    }
    out
}

/// Write `index.md` into `dir` for a completed record.
///
/// Returns `None` without writing when the record is not completed.
pub async fn write_manifest(dir: &Path, record: &JobRecord, part_secs: u64) -> Result<Option<PathBuf>> {
    if !record.completed {
        return Ok(None);
    }
    let record = record.clone();
    let text = tokio::task::spawn_blocking(move || {
        render_manifest(&record, part_secs, |p| std::fs::read_to_string(p))
    })
    .await?;
    let path = dir.join(MANIFEST_NAME);
    atomic_write_async(&path, text.into_bytes()).await?;
    tracing::info!(path = %path.display(), "manifest written");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::SegmentStats;

    #[test]
    fn manifest_lists_parts_in_order_with_rate() {
        let mut rec = JobRecord::new("talk.wav", 1800.0, 2);
        rec.mark_part_completed(
            1,
            PathBuf::from("/o/talk/part_2.txt"),
            SegmentStats {
                successful: 20,
                total: 20,
            },
        );
        rec.mark_part_completed(
            0,
            PathBuf::from("/o/talk/part_1.txt"),
            SegmentStats {
                successful: 30,
                total: 40,
            },
        );
        let text = render_manifest(&rec, 1200, |p| {
            Ok(format!("content of {}", p.file_name().unwrap().to_string_lossy()))
        });

        assert!(text.starts_with("# talk.wav\n"));
        assert!(text.contains("- Total duration: 30.0 minutes"));
        assert!(text.contains("- Recognition rate: 50/60 segments (83.3%)"));
        assert!(text.contains("- [Part 1](./part_1.txt) - 0.0-20.0 min"));
        assert!(text.contains("- [Part 2](./part_2.txt) - 20.0-30.0 min"));
        let first = text.find("content of part_1.txt").unwrap();
        let second = text.find("content of part_2.txt").unwrap();
        assert!(first < second);
    }

    #[test]
    fn single_part_range_covers_whole_file() {
        // 2000s kept whole under a 3000s split threshold, with 1200s parts.
        let mut rec = JobRecord::new("lecture.wav", 2000.0, 1);
        rec.mark_part_completed(
            0,
            PathBuf::from("/o/lecture/part_1.txt"),
            SegmentStats {
                successful: 67,
                total: 67,
            },
        );
        let text = render_manifest(&rec, 1200, |_| Ok(String::from("body")));

        assert!(text.contains("- [Part 1](./part_1.txt) - 0.0-33.3 min"));
        assert!(text.contains("### Part 1 (0.0-33.3 min)"));
    }

    #[tokio::test]
    async fn incomplete_record_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let rec = JobRecord::new("a.wav", 60.0, 1);
        assert!(write_manifest(dir.path(), &rec, 1200).await.unwrap().is_none());
        assert!(!dir.path().join(MANIFEST_NAME).exists());
    }
}
