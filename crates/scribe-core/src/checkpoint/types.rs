//! Record types stored by the checkpoint backends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Local timestamp format used in records (`YYYY-MM-DD HH:MM:SS`).
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub successful: usize,
    pub total: usize,
}

impl SegmentStats {
    /// Percentage in [0, 100]; 0 when there are no segments.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }
}

impl std::ops::AddAssign for SegmentStats {
    fn add_assign(&mut self, rhs: Self) {
        self.successful += rhs.successful;
        self.total += rhs.total;
    }
}

/// Progress of one part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    #[serde(rename = "completed_time", default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_stats: Option<SegmentStats>,
}

/// Durable progress of one source file, keyed by its path.
///
/// `completed` holds exactly when every part in `0..total_parts` is
/// completed; `refresh_completed` restores that after edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub filename: String,
    #[serde(rename = "total_duration")]
    pub total_duration_secs: f64,
    pub total_parts: usize,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub last_processed_time: String,
    #[serde(default)]
    pub interrupted: bool,
    /// Zero-based part index to part progress.
    #[serde(default)]
    pub parts: BTreeMap<usize, PartRecord>,
}

impl JobRecord {
    pub fn new(filename: impl Into<String>, total_duration_secs: f64, total_parts: usize) -> Self {
        Self {
            filename: filename.into(),
            total_duration_secs,
            total_parts,
            completed: false,
            last_processed_time: timestamp_now(),
            interrupted: false,
            parts: BTreeMap::new(),
        }
    }

    pub fn is_part_completed(&self, index: usize) -> bool {
        self.parts.get(&index).map(|p| p.completed).unwrap_or(false)
    }

    /// Parts with no entry or not yet completed, in order.
    pub fn pending_parts(&self) -> Vec<usize> {
        (0..self.total_parts)
            .filter(|i| !self.is_part_completed(*i))
            .collect()
    }

    pub fn completed_parts(&self) -> usize {
        (0..self.total_parts)
            .filter(|i| self.is_part_completed(*i))
            .count()
    }

    pub fn mark_part_completed(&mut self, index: usize, output_file: PathBuf, stats: SegmentStats) {
        self.parts.insert(
            index,
            PartRecord {
                completed: true,
                output_file: Some(output_file),
                completed_at: Some(timestamp_now()),
                segment_stats: Some(stats),
            },
        );
        self.touch();
        self.refresh_completed();
    }

    pub fn refresh_completed(&mut self) {
        self.completed = self.total_parts > 0 && self.completed_parts() == self.total_parts;
    }

    pub fn touch(&mut self) {
        self.last_processed_time = timestamp_now();
    }

    /// Sum of segment stats over all parts that have them.
    pub fn aggregate_stats(&self) -> SegmentStats {
        let mut sum = SegmentStats::default();
        for stats in self.parts.values().filter_map(|p| p.segment_stats) {
            sum += stats;
        }
        sum
    }
}
