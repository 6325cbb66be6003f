//! Result of one scheduler batch.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::segment::SegmentResults;

/// Why a segment has no text after a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The recognizer returned an error.
    Transport(String),
    /// The call completed without text.
    Empty,
    /// Cancelled by the stall scan, the batch deadline or the tail drain.
    TimedOut,
    /// The task ended without reporting a result.
    Panicked,
    /// Cancelled in flight because the interrupt flag was raised.
    Cancelled,
    /// Never submitted because the batch stopped first.
    NotStarted,
}

impl TaskFailure {
    /// Whether the segment was actually submitted in this batch.
    pub fn was_attempted(&self) -> bool {
        !matches!(self, TaskFailure::NotStarted)
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFailure::Transport(e) => write!(f, "transport error: {}", e),
            TaskFailure::Empty => f.write_str("no text"),
            TaskFailure::TimedOut => f.write_str("timed out"),
            TaskFailure::Panicked => f.write_str("task ended without a result"),
            TaskFailure::Cancelled => f.write_str("cancelled"),
            TaskFailure::NotStarted => f.write_str("not started"),
        }
    }
}

/// Everything one batch produced.
///
/// A segment index is in at most one of `results` and `failures`.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: SegmentResults,
    pub failures: BTreeMap<usize, TaskFailure>,
    /// Tasks spawned for this batch.
    pub submitted: usize,
    pub interrupted: bool,
    pub deadline_exceeded: bool,
    pub tail_drained: bool,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub(super) fn record_success(&mut self, index: usize, text: String) {
        self.failures.remove(&index);
        self.results.insert(index, text);
    }

    pub(super) fn record_failure(&mut self, index: usize, failure: TaskFailure) {
        if !self.results.contains_key(&index) {
            self.failures.insert(index, failure);
        }
    }

    pub fn success_count(&self) -> usize {
        self.results.len()
    }

    /// Indices that finished (either way) in this batch.
    pub fn finished_count(&self) -> usize {
        self.results.len()
            + self
                .failures
                .values()
                .filter(|f| f.was_attempted())
                .count()
    }
}
