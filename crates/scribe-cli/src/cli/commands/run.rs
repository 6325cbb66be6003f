//! `scribe run` – transcribe recordings part by part.

use anyhow::{bail, Result};
use scribe_core::checkpoint::CheckpointStore;
use scribe_core::config::{self, ScribeConfig};
use scribe_core::control::{install_ctrl_c_handler, InterruptFlag};
use scribe_core::dispatch::ServiceDispatcher;
use scribe_core::parts::PartManager;
use scribe_core::registry::ServiceRegistry;
use scribe_core::retry::RetryCoordinator;
use scribe_core::scheduler::{ChannelProgress, LogProgress, ProgressSink, ProgressUpdate, Scheduler};
use scribe_core::splitter::DirectorySplitter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub async fn run_transcribe(
    cfg: &ScribeConfig,
    store: Arc<dyn CheckpointStore>,
    dirs: &[PathBuf],
    output_dir: &Path,
    quiet: bool,
) -> Result<()> {
    let interrupt = InterruptFlag::new();
    let signal_handle = install_ctrl_c_handler(interrupt.clone());

    let registry = Arc::new(ServiceRegistry::new());
    let dispatcher = ServiceDispatcher::from_config(cfg, Arc::clone(&registry), interrupt.clone())?;
    if registry.is_empty() {
        let path = config::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "config.toml".to_string());
        bail!("no recognition services configured; add [[services]] to {}", path);
    }

    let (sink, progress_handle) = if quiet {
        (Arc::new(LogProgress) as Arc<dyn ProgressSink>, None)
    } else {
        let (sink, rx) = ChannelProgress::new(64);
        (
            Arc::new(sink) as Arc<dyn ProgressSink>,
            Some(spawn_progress_printer(rx)),
        )
    };

    let scheduler = Scheduler::new(Arc::new(dispatcher), cfg.scheduler.clone(), interrupt.clone())?
        .with_progress(sink);
    let coordinator = Arc::new(RetryCoordinator::from_config(Arc::new(scheduler), &cfg.retry));
    let manager = PartManager::new(coordinator, store, cfg.parts.clone(), output_dir)?;
    let splitter = DirectorySplitter::new(cfg.parts.segment_secs);

    let mut completed = 0usize;
    let mut failed = 0usize;
    for dir in dirs {
        if interrupt.is_raised() {
            break;
        }
        println!("{}", dir.display());
        match manager.process_source(&splitter, dir).await {
            Ok(outcome) => {
                println!(
                    "  parts {}/{} done, {}/{} segments recognized this run{}",
                    outcome.already_done + outcome.processed_parts.len(),
                    outcome.total_parts,
                    outcome.stats.successful,
                    outcome.stats.total,
                    if outcome.interrupted { " (interrupted)" } else { "" }
                );
                if let Some(manifest) = &outcome.manifest {
                    println!("  manifest: {}", manifest.display());
                }
                if outcome.completed {
                    completed += 1;
                }
            }
            Err(e) => {
                tracing::error!(file = %dir.display(), "processing failed: {:#}", e);
                eprintln!("  failed: {:#}", e);
                failed += 1;
            }
        }
    }

    // Dropping the manager closes the progress channel.
    drop(manager);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }
    signal_handle.abort();

    println!();
    println!("Services:");
    for stats in registry.stats() {
        println!("  {}", stats);
    }
    if interrupt.is_raised() {
        println!("Interrupted. Run the same command again to resume unfinished parts.");
    }
    println!("{} completed, {} failed, {} given.", completed, failed, dirs.len());
    Ok(())
}

/// Print progress updates, at most one line per interval plus the final one.
fn spawn_progress_printer(mut progress_rx: mpsc::Receiver<ProgressUpdate>) -> JoinHandle<()> {
    const PROGRESS_INTERVAL_MS: u64 = 500;
    tokio::spawn(async move {
        let mut last_print = Instant::now();
        while let Some(update) = progress_rx.recv().await {
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || update.current >= update.total
            {
                println!(
                    "  {} / {} segments ({:.1}%)  {}",
                    update.current,
                    update.total,
                    update.fraction() * 100.0,
                    update.message
                );
                last_print = now;
            }
        }
    })
}
