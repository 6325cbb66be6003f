//! Scheduler tests on a paused tokio clock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;
use crate::error::TransportError;

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Reply { delay_ms: u64 },
    Fail,
    Empty,
    Hang,
}

/// Recognizer whose behavior is chosen by the segment index in the file name.
struct Scripted {
    behaviors: HashMap<usize, Behavior>,
    default_delay_ms: u64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(behaviors: impl IntoIterator<Item = (usize, Behavior)>) -> Arc<Self> {
        Arc::new(Self {
            behaviors: behaviors.into_iter().collect(),
            default_delay_ms: 50,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn index_of(path: &Path) -> usize {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.trim_start_matches("seg_").parse().ok())
        .unwrap()
}

#[async_trait]
impl Recognize for Scripted {
    async fn recognize(&self, segment: &Path) -> Result<Option<String>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let index = index_of(segment);
        let behavior = self.behaviors.get(&index).copied().unwrap_or(Behavior::Reply {
            delay_ms: self.default_delay_ms,
        });
        match behavior {
            Behavior::Reply { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(Some(format!("text-{}", index)))
            }
            Behavior::Fail => Err(TransportError::Provider("boom".to_string())),
            Behavior::Empty => Ok(None),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Ok(None)
            }
        }
    }
}

fn segments(n: usize) -> Vec<Segment> {
    (0..n)
        .map(|i| Segment::new(i, format!("seg_{}.wav", i)))
        .collect()
}

fn config(workers: usize) -> SchedulerConfig {
    SchedulerConfig {
        workers,
        ..SchedulerConfig::default()
    }
}

fn scheduler(recognizer: Arc<Scripted>, cfg: SchedulerConfig) -> Scheduler {
    Scheduler::new(recognizer, cfg, InterruptFlag::new()).unwrap()
}

/// Records every report; optionally raises the interrupt flag at `raise_at`.
struct Recorder {
    reports: Mutex<Vec<(usize, usize)>>,
    raise_at: Option<(usize, InterruptFlag)>,
}

impl Recorder {
    fn new(raise_at: Option<(usize, InterruptFlag)>) -> Arc<Self> {
        Arc::new(Self {
            reports: Mutex::new(Vec::new()),
            raise_at,
        })
    }
}

impl ProgressSink for Recorder {
    fn report(&self, current: usize, total: usize, _message: &str) {
        self.reports.lock().unwrap().push((current, total));
        if let Some((k, flag)) = &self.raise_at {
            if current == *k {
                flag.raise();
            }
        }
    }
}

#[test]
fn zero_workers_rejected() {
    let err = Scheduler::new(Scripted::new([]), config(0), InterruptFlag::new()).err();
    assert_eq!(err, Some(ConfigError::ZeroWorkers));
}

#[tokio::test(start_paused = true)]
async fn results_keyed_by_index_regardless_of_completion_order() {
    // Later segments finish first.
    let rec = Scripted::new((0..10).map(|i| {
        (
            i,
            Behavior::Reply {
                delay_ms: 1000 - i as u64 * 100,
            },
        )
    }));
    let outcome = scheduler(rec.clone(), config(3)).run(&segments(10)).await;

    assert_eq!(outcome.results.len(), 10);
    for (i, text) in &outcome.results {
        assert_eq!(text, &format!("text-{}", i));
    }
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.submitted, 10);
    assert!(rec.max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[tokio::test(start_paused = true)]
async fn failures_are_recorded_not_raised() {
    let rec = Scripted::new([(1, Behavior::Fail), (2, Behavior::Empty)]);
    let outcome = scheduler(rec, config(2)).run(&segments(4)).await;

    assert_eq!(outcome.results.keys().copied().collect::<Vec<_>>(), vec![0, 3]);
    assert!(matches!(
        outcome.failures.get(&1),
        Some(TaskFailure::Transport(_))
    ));
    assert_eq!(outcome.failures.get(&2), Some(&TaskFailure::Empty));
    for index in outcome.results.keys() {
        assert!(!outcome.failures.contains_key(index));
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_task_is_cancelled_after_task_timeout() {
    let rec = Scripted::new([(1, Behavior::Hang)]);
    let outcome = scheduler(rec.clone(), config(3)).run(&segments(3)).await;

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.failures.get(&1), Some(&TaskFailure::TimedOut));
    assert!(!outcome.deadline_exceeded);
    assert!(outcome.elapsed >= Duration::from_secs(60));
    assert!(outcome.elapsed < Duration::from_secs(80));
    assert_eq!(rec.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn batch_deadline_cancels_all_remaining() {
    let rec = Scripted::new([(0, Behavior::Hang), (1, Behavior::Hang)]);
    let cfg = SchedulerConfig {
        task_timeout_secs: 10_000,
        ..config(1)
    };
    let outcome = scheduler(rec.clone(), cfg).run(&segments(3)).await;

    assert!(outcome.deadline_exceeded);
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.failures.get(&0), Some(&TaskFailure::TimedOut));
    assert_eq!(outcome.failures.get(&1), Some(&TaskFailure::NotStarted));
    assert_eq!(outcome.failures.get(&2), Some(&TaskFailure::NotStarted));
    assert_eq!(outcome.submitted, 1);
    // Floor of 300s applies to small batches.
    assert!(outcome.elapsed >= Duration::from_secs(300));
    assert!(outcome.elapsed < Duration::from_secs(302));
}

#[tokio::test(start_paused = true)]
async fn slow_tail_is_drained_before_the_deadline() {
    let rec = Scripted::new([(17, Behavior::Hang)]);
    let cfg = SchedulerConfig {
        task_timeout_secs: 10_000,
        ..config(40)
    };
    let outcome = scheduler(rec, cfg).run(&segments(40)).await;

    // Deadline is 40 * 10s = 400s; the tail drains once 80% of it has passed.
    assert!(outcome.tail_drained);
    assert!(!outcome.deadline_exceeded);
    assert_eq!(outcome.results.len(), 39);
    assert_eq!(outcome.failures.get(&17), Some(&TaskFailure::TimedOut));
    assert!(outcome.elapsed > Duration::from_secs(320));
    assert!(outcome.elapsed < Duration::from_secs(400));
}

#[tokio::test(start_paused = true)]
async fn interrupt_after_k_completions_stops_submission() {
    let (n, w, k) = (20, 4, 6);
    let interrupt = InterruptFlag::new();
    let rec = Scripted::new((0..n).map(|i| {
        (
            i,
            Behavior::Reply {
                delay_ms: 100 + i as u64 * 10,
            },
        )
    }));
    let sink = Recorder::new(Some((k, interrupt.clone())));
    let scheduler = Scheduler::new(rec.clone(), config(w), interrupt.clone())
        .unwrap()
        .with_progress(sink.clone());

    let outcome = scheduler.run(&segments(n)).await;

    assert!(outcome.interrupted);
    assert_eq!(outcome.results.len(), k);
    // One refill per completion before the flag, none after.
    assert_eq!(outcome.submitted, k + w - 1);
    assert_eq!(rec.calls.load(Ordering::SeqCst), k + w - 1);
    let cancelled = outcome
        .failures
        .values()
        .filter(|f| **f == TaskFailure::Cancelled)
        .count();
    let not_started = outcome
        .failures
        .values()
        .filter(|f| **f == TaskFailure::NotStarted)
        .count();
    assert_eq!(cancelled, w - 1);
    assert_eq!(not_started, n - (k + w - 1));
}

#[tokio::test(start_paused = true)]
async fn raised_interrupt_submits_nothing() {
    let interrupt = InterruptFlag::new();
    interrupt.raise();
    let rec = Scripted::new([]);
    let scheduler = Scheduler::new(rec.clone(), config(4), interrupt).unwrap();
    let outcome = scheduler.run(&segments(5)).await;

    assert!(outcome.interrupted);
    assert_eq!(outcome.submitted, 0);
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.failures.len(), 5);
    assert_eq!(rec.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn progress_is_monotonic_and_ends_at_total() {
    let rec = Scripted::new([(3, Behavior::Fail)]);
    let sink = Recorder::new(None);
    let scheduler = scheduler(rec, config(2)).with_progress(sink.clone());
    scheduler.run(&segments(6)).await;

    let reports = sink.reports.lock().unwrap().clone();
    assert!(!reports.is_empty());
    assert!(reports.windows(2).all(|w| w[0].0 <= w[1].0));
    assert!(reports.iter().all(|(_, total)| *total == 6));
    assert_eq!(reports.last(), Some(&(6, 6)));
}

#[tokio::test(start_paused = true)]
async fn empty_batch_finishes_immediately() {
    let sink = Recorder::new(None);
    let scheduler = scheduler(Scripted::new([]), config(2)).with_progress(sink.clone());
    let outcome = scheduler.run(&[]).await;
    assert_eq!(outcome.submitted, 0);
    assert!(outcome.results.is_empty());
    assert_eq!(sink.reports.lock().unwrap().last(), Some(&(0, 0)));
}

/// Yields once, then answers; finishes within microseconds of reporting.
struct Quick;

#[async_trait]
impl Recognize for Quick {
    async fn recognize(&self, segment: &Path) -> Result<Option<String>, TransportError> {
        tokio::task::yield_now().await;
        Ok(Some(format!("text-{}", index_of(segment))))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stall_scan_keeps_results_of_tasks_finishing_mid_scan() {
    let cfg = SchedulerConfig {
        workers: 64,
        poll_interval_ms: 1,
        stall_check_interval_secs: 1,
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(Arc::new(Quick), cfg, InterruptFlag::new()).unwrap();

    // Keep batches running across several stall scans.
    let until = std::time::Instant::now() + Duration::from_secs(3);
    let mut batches = 0;
    while std::time::Instant::now() < until || batches == 0 {
        let outcome = scheduler.run(&segments(2000)).await;
        let lost = outcome
            .failures
            .values()
            .filter(|f| **f == TaskFailure::Panicked)
            .count();
        assert_eq!(lost, 0);
        assert_eq!(outcome.results.len(), 2000);
        batches += 1;
    }
}
