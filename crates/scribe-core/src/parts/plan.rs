use std::ops::Range;

use crate::config::PartConfig;

/// How one file's segments are grouped into parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    pub total_parts: usize,
    pub segments_per_part: usize,
    pub segment_count: usize,
    pub segment_secs: u64,
}

impl PartPlan {
    /// Files at or below the split threshold become one part holding every
    /// segment. Longer files get `ceil(duration / part_secs)` parts of
    /// `part_secs / segment_secs` segments; the last part takes whatever is left.
    pub fn new(duration_secs: f64, segment_count: usize, cfg: &PartConfig) -> Self {
        let single = duration_secs <= cfg.split_threshold_secs as f64;
        let total_parts = if single {
            1
        } else {
            ((duration_secs / cfg.part_secs as f64).ceil() as usize).max(1)
        };
        let segments_per_part = if single {
            segment_count.max(1)
        } else {
            cfg.segments_per_part()
        };
        Self {
            total_parts,
            segments_per_part,
            segment_count,
            segment_secs: cfg.segment_secs,
        }
    }

    /// Segment indices owned by `part`. Parts are contiguous and together
    /// cover `0..segment_count` exactly once.
    pub fn range(&self, part: usize) -> Range<usize> {
        let start = (part * self.segments_per_part).min(self.segment_count);
        let end = if part + 1 >= self.total_parts {
            self.segment_count
        } else {
            ((part + 1) * self.segments_per_part).min(self.segment_count)
        };
        start..end.max(start)
    }

    /// Start and end of `part` in seconds.
    pub fn time_range(&self, part: usize) -> (u64, u64) {
        let range = self.range(part);
        (
            range.start as u64 * self.segment_secs,
            range.end as u64 * self.segment_secs,
        )
    }
}
