//! Segment scheduler.
//!
//! Runs one batch of segment recognitions on a bounded pool of tokio tasks
//! and enforces three limits on top of it:
//! - a per-task deadline, checked by a periodic stall scan
//! - a batch deadline proportional to the segment count (with a floor)
//! - a tail drain that gives up on the last few stragglers once most of the
//!   batch deadline is spent
//!
//! The interrupt flag is polled on every loop iteration. Results are keyed
//! by segment index, never by completion order.

mod outcome;
mod progress;
mod run;

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::control::InterruptFlag;
use crate::dispatch::Recognize;
use crate::error::ConfigError;
use crate::segment::Segment;

pub use outcome::{BatchOutcome, TaskFailure};
pub use progress::{ChannelProgress, LogProgress, ProgressSink, ProgressUpdate};

/// Bounded-concurrency runner for one batch of segments at a time.
pub struct Scheduler {
    recognizer: Arc<dyn Recognize>,
    config: SchedulerConfig,
    interrupt: InterruptFlag,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl Scheduler {
    /// Fails if the configuration is unusable (zero workers, zero timeouts,
    /// ratios outside (0, 1]).
    pub fn new(
        recognizer: Arc<dyn Recognize>,
        config: SchedulerConfig,
        interrupt: InterruptFlag,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            recognizer,
            config,
            interrupt,
            progress: None,
        })
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn interrupt(&self) -> &InterruptFlag {
        &self.interrupt
    }

    /// Recognize every segment in `segments` and wait for the batch to end.
    ///
    /// Never fails: per-segment problems land in `BatchOutcome::failures`.
    pub async fn run(&self, segments: &[Segment]) -> BatchOutcome {
        run::run_batch(self, segments).await
    }
}

#[cfg(test)]
mod tests;
