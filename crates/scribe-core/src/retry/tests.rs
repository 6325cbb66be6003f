use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::*;
use crate::config::SchedulerConfig;
use crate::control::InterruptFlag;
use crate::dispatch::Recognize;
use crate::error::TransportError;
use crate::scheduler::Scheduler;
use crate::segment::{Segment, SegmentResults, SegmentStatus};

/// Fails each segment a fixed number of times before succeeding.
struct Flaky {
    failures_before_success: HashMap<String, u32>,
    calls: Mutex<HashMap<String, u32>>,
}

impl Flaky {
    fn new(failing: &[(&str, u32)]) -> Arc<Self> {
        Arc::new(Self {
            failures_before_success: failing
                .iter()
                .map(|(name, n)| (name.to_string(), *n))
                .collect(),
            calls: Mutex::new(HashMap::new()),
        })
    }

    fn calls(&self, name: &str) -> u32 {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Recognize for Flaky {
    async fn recognize(&self, segment: &Path) -> Result<Option<String>, TransportError> {
        let name = segment.to_string_lossy().to_string();
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let c = calls.entry(name.clone()).or_insert(0);
            *c += 1;
            *c
        };
        let fail_for = self.failures_before_success.get(&name).copied().unwrap_or(0);
        if call <= fail_for {
            return Err(TransportError::Provider("unavailable".to_string()));
        }
        Ok(Some(format!("text of {}", name)))
    }
}

fn coordinator(rec: Arc<Flaky>, max_retries: u32, interrupt: InterruptFlag) -> RetryCoordinator {
    let cfg = SchedulerConfig {
        workers: 2,
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(rec, cfg, interrupt).unwrap();
    RetryCoordinator::new(Arc::new(scheduler), max_retries)
}

fn segments(n: usize) -> Vec<Segment> {
    Segment::from_paths((0..n).map(|i| format!("s{}", i)))
}

#[tokio::test(start_paused = true)]
async fn succeeded_segments_are_never_resubmitted() {
    let rec = Flaky::new(&[("s2", u32::MAX), ("s4", 1)]);
    let coord = coordinator(rec.clone(), 3, InterruptFlag::new());
    let mut segs = segments(6);

    let report = coord.transcribe(&mut segs).await;

    assert_eq!(rec.calls("s0"), 1);
    assert_eq!(rec.calls("s4"), 2);
    assert_eq!(rec.calls("s2"), 4);
    assert_eq!(report.stats.rounds_used, 3);
    assert_eq!(report.stats.success_count, 5);
    assert_eq!(report.stats.fail_count, 1);
    assert!(!report.results.contains_key(&2));
    // Round 1 resubmits {2, 4}; later rounds only {2}.
    let submitted: Vec<usize> = report.rounds.iter().map(|r| r.submitted).collect();
    assert_eq!(submitted, vec![2, 1, 1]);
    assert_eq!(report.rounds[0].recovered, 1);

    assert_eq!(segs[2].status, SegmentStatus::Failed);
    assert_eq!(segs[2].attempts, 4);
    assert!(segs[4].is_success());
    assert_eq!(segs[4].attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn stops_early_when_nothing_fails() {
    let rec = Flaky::new(&[]);
    let coord = coordinator(rec, 5, InterruptFlag::new());
    let mut segs = segments(4);
    let report = coord.transcribe(&mut segs).await;
    assert_eq!(report.stats.rounds_used, 0);
    assert_eq!(report.stats.success_count, 4);
    assert!((report.stats.success_rate() - 100.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn zero_retries_keeps_initial_failures() {
    let rec = Flaky::new(&[("s1", 1)]);
    let coord = coordinator(rec.clone(), 0, InterruptFlag::new());
    let mut segs = segments(3);
    let report = coord.transcribe(&mut segs).await;
    assert_eq!(report.stats.rounds_used, 0);
    assert_eq!(report.stats.fail_count, 1);
    assert_eq!(rec.calls("s1"), 1);
}

#[tokio::test(start_paused = true)]
async fn raised_interrupt_skips_retry_rounds() {
    let interrupt = InterruptFlag::new();
    let rec = Flaky::new(&[]);
    let coord = coordinator(rec.clone(), 3, interrupt.clone());
    let mut segs = segments(3);
    let mut prior = SegmentResults::new();
    prior.insert(0, "kept".to_string());
    interrupt.raise();

    let report = coord.retry_failed(&mut segs, prior).await;

    assert!(report.interrupted);
    assert_eq!(report.stats.rounds_used, 0);
    assert_eq!(report.results.get(&0).map(String::as_str), Some("kept"));
    assert_eq!(report.stats.success_count, 1);
    assert_eq!(rec.calls("s1"), 0);
}
