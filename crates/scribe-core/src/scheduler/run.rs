//! The batch loop: refill, wait, scan, enforce deadlines.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

use super::outcome::{BatchOutcome, TaskFailure};
use super::progress::ProgressSink;
use super::Scheduler;
use crate::dispatch::Recognize;
use crate::error::TransportError;
use crate::segment::Segment;

/// Message a task sends when its recognition call returns.
type Report = (usize, Result<Option<String>, TransportError>);

/// A submitted task that has not reported yet.
struct InFlight {
    started: Instant,
    handle: JoinHandle<()>,
}

/// Monotonic progress counter over one batch.
struct ProgressTracker {
    sink: Option<Arc<dyn ProgressSink>>,
    current: usize,
    total: usize,
}

impl ProgressTracker {
    fn new(total: usize, sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self {
            sink,
            current: 0,
            total,
        }
    }

    fn advance(&mut self, message: &str) {
        self.current = (self.current + 1).min(self.total);
        if let Some(sink) = &self.sink {
            sink.report(self.current, self.total, message);
        }
    }

    fn finish(&mut self, outcome: &BatchOutcome) {
        self.current = self.total;
        if let Some(sink) = &self.sink {
            let message = format!(
                "batch finished: {}/{} recognized",
                outcome.success_count(),
                self.total
            );
            sink.report(self.total, self.total, &message);
        }
    }
}

fn spawn_task(
    recognizer: &Arc<dyn Recognize>,
    segment: &Segment,
    tx: mpsc::Sender<Report>,
) -> JoinHandle<()> {
    let recognizer = Arc::clone(recognizer);
    let index = segment.index;
    let path = segment.path.clone();
    tokio::spawn(async move {
        let result = recognizer.recognize(&path).await;
        let _ = tx.send((index, result)).await;
    })
}

/// Apply one task report. Reports for tasks no longer in flight were
/// cancelled earlier and are dropped.
fn accept(
    (index, result): Report,
    active: &mut HashMap<usize, InFlight>,
    outcome: &mut BatchOutcome,
    progress: &mut ProgressTracker,
) {
    if active.remove(&index).is_none() {
        tracing::debug!(segment = index, "discarding result of cancelled task");
        return;
    }
    match result {
        Ok(Some(text)) if !text.trim().is_empty() => {
            outcome.record_success(index, text);
            progress.advance(&format!("segment {} recognized", index));
        }
        Ok(_) => {
            outcome.record_failure(index, TaskFailure::Empty);
            progress.advance(&format!("segment {} returned no text", index));
        }
        Err(e) => {
            tracing::debug!(segment = index, "recognition failed: {}", e);
            outcome.record_failure(index, TaskFailure::Transport(e.to_string()));
            progress.advance(&format!("segment {} failed", index));
        }
    }
}

/// Abort every in-flight task with `failure` and mark the rest as never started.
fn cancel_all(
    active: &mut HashMap<usize, InFlight>,
    pending: &mut VecDeque<&Segment>,
    outcome: &mut BatchOutcome,
    progress: &mut ProgressTracker,
    failure: TaskFailure,
) {
    for (index, task) in active.drain() {
        task.handle.abort();
        outcome.record_failure(index, failure.clone());
        progress.advance(&format!("segment {} {}", index, failure));
    }
    for segment in pending.drain(..) {
        outcome.record_failure(segment.index, TaskFailure::NotStarted);
    }
}

pub(super) async fn run_batch(scheduler: &Scheduler, segments: &[Segment]) -> BatchOutcome {
    let cfg = &scheduler.config;
    let interrupt = &scheduler.interrupt;
    let total = segments.len();
    let mut outcome = BatchOutcome::default();
    let mut progress = ProgressTracker::new(total, scheduler.progress.clone());

    let started = Instant::now();
    let deadline = cfg.batch_timeout(total);
    let task_timeout = cfg.task_timeout();
    let poll = cfg.poll_interval();
    let stall_every = cfg.stall_check_interval();
    let mut next_stall_check = started + stall_every;

    let mut pending: VecDeque<&Segment> = segments.iter().collect();
    let mut active: HashMap<usize, InFlight> = HashMap::with_capacity(cfg.workers);
    let (tx, mut rx) = mpsc::channel::<Report>(cfg.workers.saturating_mul(2));

    tracing::debug!(
        segments = total,
        workers = cfg.workers,
        deadline_secs = deadline.as_secs(),
        "batch started"
    );

    loop {
        if interrupt.is_raised() {
            tracing::warn!(
                in_flight = active.len(),
                pending = pending.len(),
                "interrupt observed; cancelling batch"
            );
            outcome.interrupted = true;
            cancel_all(
                &mut active,
                &mut pending,
                &mut outcome,
                &mut progress,
                TaskFailure::Cancelled,
            );
            break;
        }

        while active.len() < cfg.workers {
            let Some(segment) = pending.pop_front() else {
                break;
            };
            let handle = spawn_task(&scheduler.recognizer, segment, tx.clone());
            active.insert(
                segment.index,
                InFlight {
                    started: Instant::now(),
                    handle,
                },
            );
            outcome.submitted += 1;
        }
        if active.is_empty() {
            break;
        }

        if started.elapsed() >= deadline {
            tracing::warn!(
                in_flight = active.len(),
                pending = pending.len(),
                deadline_secs = deadline.as_secs(),
                "batch deadline exceeded; cancelling remaining tasks"
            );
            outcome.deadline_exceeded = true;
            cancel_all(
                &mut active,
                &mut pending,
                &mut outcome,
                &mut progress,
                TaskFailure::TimedOut,
            );
            break;
        }

        match timeout(poll, rx.recv()).await {
            Ok(Some(report)) => accept(report, &mut active, &mut outcome, &mut progress),
            // Unreachable while `tx` is held here.
            Ok(None) => break,
            Err(_) => {}
        }

        let now = Instant::now();
        if now >= next_stall_check {
            next_stall_check = now + stall_every;
            // Collect anything already reported so finished tasks are not
            // mistaken for stalled ones.
            while !interrupt.is_raised() {
                match rx.try_recv() {
                    Ok(report) => accept(report, &mut active, &mut outcome, &mut progress),
                    Err(_) => break,
                }
            }
            if interrupt.is_raised() {
                continue;
            }
            // (index, finished) pairs; `finished` is read before the second
            // drain below so a report sent just before finishing is still seen.
            let stalled: Vec<(usize, bool)> = active
                .iter()
                .filter_map(|(i, t)| {
                    let finished = t.handle.is_finished();
                    (finished || now.saturating_duration_since(t.started) > task_timeout)
                        .then_some((*i, finished))
                })
                .collect();
            if !stalled.is_empty() {
                while let Ok(report) = rx.try_recv() {
                    accept(report, &mut active, &mut outcome, &mut progress);
                }
            }
            for (index, finished) in stalled {
                // Reported during the second drain.
                let Some(task) = active.remove(&index) else {
                    continue;
                };
                if finished {
                    tracing::warn!(segment = index, "task ended without reporting a result");
                    outcome.record_failure(index, TaskFailure::Panicked);
                    progress.advance(&format!("segment {} lost", index));
                } else {
                    task.handle.abort();
                    tracing::warn!(
                        segment = index,
                        running_secs = now.saturating_duration_since(task.started).as_secs(),
                        "task exceeded its deadline; cancelled"
                    );
                    outcome.record_failure(index, TaskFailure::TimedOut);
                    progress.advance(&format!("segment {} timed out", index));
                }
            }
        }

        if interrupt.is_raised() {
            continue;
        }

        let remaining = active.len() + pending.len();
        let elapsed = started.elapsed();
        if remaining > 0
            && (remaining as f64) < cfg.tail_remaining_ratio * total as f64
            && elapsed.as_secs_f64() > cfg.tail_elapsed_ratio * deadline.as_secs_f64()
        {
            tracing::warn!(
                remaining,
                elapsed_secs = elapsed.as_secs(),
                "draining slow tail of batch"
            );
            outcome.tail_drained = true;
            cancel_all(
                &mut active,
                &mut pending,
                &mut outcome,
                &mut progress,
                TaskFailure::TimedOut,
            );
            break;
        }
    }

    outcome.elapsed = started.elapsed();
    tracing::debug!(
        recognized = outcome.success_count(),
        failed = outcome.failures.len(),
        submitted = outcome.submitted,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "batch finished"
    );
    progress.finish(&outcome);
    outcome
}
