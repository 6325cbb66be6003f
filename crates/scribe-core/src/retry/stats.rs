use serde::Serialize;

use crate::segment::SegmentResults;

/// Aggregate counts over the initial pass and all retry rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryStats {
    pub total_count: usize,
    pub success_count: usize,
    pub fail_count: usize,
    /// Retry rounds actually run (the initial pass is not a round).
    pub rounds_used: u32,
}

impl RetryStats {
    /// Success percentage in [0, 100]; 0 for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.total_count as f64 * 100.0
    }
}

/// One retry round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub round: u32,
    pub submitted: usize,
    pub recovered: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RetryReport {
    pub results: SegmentResults,
    pub stats: RetryStats,
    /// Stopped early because the interrupt flag was raised.
    pub interrupted: bool,
    pub rounds: Vec<RoundSummary>,
}
