use std::collections::HashSet;
use std::sync::Arc;

use super::stats::{RetryReport, RetryStats, RoundSummary};
use crate::config::RetryConfig;
use crate::scheduler::{BatchOutcome, Scheduler};
use crate::segment::{Segment, SegmentResults};

/// Drives the initial pass and the retry rounds through one scheduler.
pub struct RetryCoordinator {
    scheduler: Arc<Scheduler>,
    max_retries: u32,
}

impl RetryCoordinator {
    pub fn new(scheduler: Arc<Scheduler>, max_retries: u32) -> Self {
        Self {
            scheduler,
            max_retries,
        }
    }

    pub fn from_config(scheduler: Arc<Scheduler>, cfg: &RetryConfig) -> Self {
        Self::new(scheduler, cfg.max_retries)
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Initial pass over every segment, then retry rounds for the failures.
    ///
    /// Segment status, text and attempt counts are updated in place.
    pub async fn transcribe(&self, segments: &mut [Segment]) -> RetryReport {
        let outcome = self.scheduler.run(segments).await;
        apply_outcome(segments, &outcome);
        tracing::info!(
            recognized = outcome.success_count(),
            total = segments.len(),
            "initial pass finished"
        );
        if outcome.interrupted {
            return finish(segments, outcome.results, Vec::new(), true);
        }
        self.retry_failed(segments, outcome.results).await
    }

    /// Resubmit every segment missing from `results`, round by round.
    pub async fn retry_failed(
        &self,
        segments: &mut [Segment],
        mut results: SegmentResults,
    ) -> RetryReport {
        let interrupt = self.scheduler.interrupt();
        let mut failed: HashSet<usize> = segments
            .iter()
            .map(|s| s.index)
            .filter(|i| !results.contains_key(i))
            .collect();
        let mut rounds = Vec::new();
        let mut interrupted = false;

        for round in 1..=self.max_retries {
            if failed.is_empty() {
                break;
            }
            if interrupt.is_raised() {
                tracing::warn!(round, "interrupt observed; skipping remaining retry rounds");
                interrupted = true;
                break;
            }
            let batch: Vec<Segment> = segments
                .iter()
                .filter(|s| failed.contains(&s.index))
                .cloned()
                .collect();
            tracing::info!(round, segments = batch.len(), "retrying failed segments");

            let outcome = self.scheduler.run(&batch).await;
            apply_outcome(segments, &outcome);
            rounds.push(RoundSummary {
                round,
                submitted: outcome.submitted,
                recovered: outcome.success_count(),
            });
            failed = batch
                .iter()
                .map(|s| s.index)
                .filter(|i| !outcome.results.contains_key(i))
                .collect();
            results.extend(outcome.results);
            tracing::info!(
                round,
                still_failed = failed.len(),
                "retry round finished"
            );
            if outcome.interrupted {
                interrupted = true;
                break;
            }
        }

        finish(segments, results, rounds, interrupted)
    }
}

/// Copy one batch's outcome onto the caller's segments. Segments the batch
/// never started are left as they were.
fn apply_outcome(segments: &mut [Segment], outcome: &BatchOutcome) {
    for segment in segments.iter_mut() {
        if let Some(text) = outcome.results.get(&segment.index) {
            segment.attempts += 1;
            segment.mark_success(text.clone());
        } else if let Some(failure) = outcome.failures.get(&segment.index) {
            if failure.was_attempted() {
                segment.attempts += 1;
                segment.mark_failed();
            }
        }
    }
}

fn finish(
    segments: &[Segment],
    results: SegmentResults,
    rounds: Vec<RoundSummary>,
    interrupted: bool,
) -> RetryReport {
    let total_count = segments.len();
    let success_count = segments
        .iter()
        .filter(|s| results.contains_key(&s.index))
        .count();
    let stats = RetryStats {
        total_count,
        success_count,
        fail_count: total_count - success_count,
        rounds_used: rounds.len() as u32,
    };
    if stats.fail_count > 0 && !interrupted {
        tracing::warn!(
            failed = stats.fail_count,
            total = total_count,
            "segments left unrecognized after all retry rounds"
        );
    }
    RetryReport {
        results,
        stats,
        interrupted,
        rounds,
    }
}
