//! CLI for the scribe transcription engine.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scribe_core::checkpoint::open_store;
use scribe_core::config::{self, ScribeConfig};
use std::path::PathBuf;

use commands::{run_repair, run_status, run_transcribe};

/// Top-level CLI for scribe.
#[derive(Debug, Parser)]
#[command(name = "scribe")]
#[command(about = "scribe: resumable batch transcription over flaky recognition services", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Transcribe recordings. Each DIR holds the segment files of one recording.
    Run {
        #[arg(required = true, value_name = "DIR")]
        dirs: Vec<PathBuf>,
        /// Concurrent recognition calls per batch (overrides config).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Retry rounds for failed segments (overrides config).
        #[arg(long, value_name = "N")]
        max_retries: Option<u32>,
        /// Where part files and manifests are written (default: config, then current dir).
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Send progress to the log file instead of the terminal.
        #[arg(long)]
        quiet: bool,
    },

    /// Show checkpointed jobs.
    Status,

    /// Rebuild manifests from part files found under OUTPUT_DIR.
    Repair {
        output_dir: PathBuf,
    },
}

/// Apply command-line overrides on top of the loaded config.
fn apply_overrides(
    cfg: &mut ScribeConfig,
    workers: Option<usize>,
    max_retries: Option<u32>,
    output: Option<PathBuf>,
) {
    if let Some(w) = workers {
        cfg.scheduler.workers = w;
    }
    if let Some(r) = max_retries {
        cfg.retry.max_retries = r;
    }
    if output.is_some() {
        cfg.output_dir = output;
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;

        match cli.command {
            CliCommand::Run {
                dirs,
                workers,
                max_retries,
                output,
                quiet,
            } => {
                apply_overrides(&mut cfg, workers, max_retries, output);
                cfg.validate()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let output_dir = match &cfg.output_dir {
                    Some(dir) => dir.clone(),
                    None => std::env::current_dir()?,
                };
                let store = open_store(cfg.checkpoint_backend).await?;
                run_transcribe(&cfg, store, &dirs, &output_dir, quiet).await?;
            }
            CliCommand::Status => {
                let store = open_store(cfg.checkpoint_backend).await?;
                run_status(store.as_ref()).await?;
            }
            CliCommand::Repair { output_dir } => {
                cfg.parts.validate()?;
                let store = open_store(cfg.checkpoint_backend).await?;
                run_repair(store.as_ref(), &output_dir, cfg.parts.part_secs).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
