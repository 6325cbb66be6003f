//! Integration test: initial pass plus one retry round over a flaky recognizer.

mod common;

use common::recognizer::ScriptedRecognizer;
use scribe_core::config::SchedulerConfig;
use scribe_core::control::InterruptFlag;
use scribe_core::retry::RetryCoordinator;
use scribe_core::scheduler::Scheduler;
use scribe_core::segment::Segment;
use std::path::Path;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn two_failures_recovered_in_one_round() {
    let rec = ScriptedRecognizer::new()
        .failing("seg_3.wav", 1)
        .failing("seg_7.wav", 1)
        .build();
    let cfg = SchedulerConfig {
        workers: 3,
        ..SchedulerConfig::default()
    };
    let scheduler = Arc::new(Scheduler::new(rec.clone(), cfg, InterruptFlag::new()).unwrap());
    let segments = Segment::from_paths(common::recognizer::segment_paths(Path::new("rec"), 10));

    let initial = scheduler.run(&segments).await;
    assert_eq!(initial.results.len(), 8);
    assert!(!initial.results.contains_key(&3));
    assert!(!initial.results.contains_key(&7));
    assert!(initial.results.keys().all(|k| *k < 10));

    let coordinator = RetryCoordinator::new(scheduler, 3);
    let mut segments = segments;
    let report = coordinator.retry_failed(&mut segments, initial.results).await;

    assert_eq!(report.results.len(), 10);
    assert_eq!(report.stats.rounds_used, 1);
    assert_eq!(report.stats.success_count, 10);
    assert_eq!(report.stats.fail_count, 0);
    assert_eq!(report.rounds[0].submitted, 2);
    assert_eq!(rec.call_count("seg_3.wav"), 2);
    assert_eq!(rec.call_count("seg_0.wav"), 1);
    assert_eq!(
        report.results.get(&7).map(String::as_str),
        Some("text of seg_7.wav")
    );
}

#[tokio::test(start_paused = true)]
async fn transcribe_runs_both_phases() {
    let rec = ScriptedRecognizer::new()
        .failing("seg_3.wav", 1)
        .failing("seg_7.wav", 1)
        .build();
    let cfg = SchedulerConfig {
        workers: 3,
        ..SchedulerConfig::default()
    };
    let scheduler = Arc::new(Scheduler::new(rec, cfg, InterruptFlag::new()).unwrap());
    let coordinator = RetryCoordinator::new(scheduler, 3);
    let mut segments =
        Segment::from_paths(common::recognizer::segment_paths(Path::new("rec"), 10));

    let report = coordinator.transcribe(&mut segments).await;

    assert_eq!(report.stats.rounds_used, 1);
    assert_eq!(report.results.len(), 10);
    assert!(segments.iter().all(|s| s.is_success()));
    assert_eq!(segments[3].attempts, 2);
    assert_eq!(segments[4].attempts, 1);
}
