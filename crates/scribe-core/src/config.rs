use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::registry::SelectionStrategy;

/// Segment scheduler timing and pool size (`[scheduler]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum recognition calls in flight per batch.
    pub workers: usize,
    /// How long the scheduler waits for a completion before re-checking
    /// the interrupt flag and deadlines. Must not exceed one second.
    pub poll_interval_ms: u64,
    /// Interval between scans for stalled tasks.
    pub stall_check_interval_secs: u64,
    /// A task running longer than this is cancelled and counted as failed.
    pub task_timeout_secs: u64,
    /// Batch deadline contribution per segment.
    pub batch_timeout_per_segment_secs: u64,
    /// Lower bound on the batch deadline for small batches.
    pub batch_timeout_floor_secs: u64,
    /// Tail drain triggers when fewer than this fraction of tasks remain...
    pub tail_remaining_ratio: f64,
    /// ...and more than this fraction of the batch deadline has elapsed.
    pub tail_elapsed_ratio: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval_ms: 1000,
            stall_check_interval_secs: 10,
            task_timeout_secs: 60,
            batch_timeout_per_segment_secs: 10,
            batch_timeout_floor_secs: 300,
            tail_remaining_ratio: 0.05,
            tail_elapsed_ratio: 0.8,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stall_check_interval(&self) -> Duration {
        Duration::from_secs(self.stall_check_interval_secs)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    /// Batch deadline: proportional to the segment count, never below the floor.
    pub fn batch_timeout(&self, segment_count: usize) -> Duration {
        let proportional = self
            .batch_timeout_per_segment_secs
            .saturating_mul(segment_count as u64);
        Duration::from_secs(proportional.max(self.batch_timeout_floor_secs))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::NonPositive {
                field: "scheduler.poll_interval_ms",
            });
        }
        if self.poll_interval_ms > 1000 {
            return Err(ConfigError::PollIntervalTooLong(self.poll_interval_ms));
        }
        for (field, value) in [
            ("scheduler.stall_check_interval_secs", self.stall_check_interval_secs),
            ("scheduler.task_timeout_secs", self.task_timeout_secs),
            ("scheduler.batch_timeout_floor_secs", self.batch_timeout_floor_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::NonPositive { field });
            }
        }
        for (field, value) in [
            ("scheduler.tail_remaining_ratio", self.tail_remaining_ratio),
            ("scheduler.tail_elapsed_ratio", self.tail_elapsed_ratio),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::RatioOutOfRange { field, value });
            }
        }
        Ok(())
    }
}

/// Retry rounds for failed segments (`[retry]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Rounds after the initial pass. 0 disables retries.
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Segment and part geometry (`[parts]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartConfig {
    /// Duration of one segment as produced by the splitter.
    pub segment_secs: u64,
    /// Duration of one checkpointed part.
    pub part_secs: u64,
    /// Files at or below this duration are processed as a single part.
    pub split_threshold_secs: u64,
}

impl Default for PartConfig {
    fn default() -> Self {
        Self {
            segment_secs: 30,
            part_secs: 1200,
            split_threshold_secs: 1200,
        }
    }
}

impl PartConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_secs == 0 {
            return Err(ConfigError::NonPositive {
                field: "parts.segment_secs",
            });
        }
        if self.part_secs == 0 {
            return Err(ConfigError::NonPositive {
                field: "parts.part_secs",
            });
        }
        if self.part_secs < self.segment_secs {
            return Err(ConfigError::PartShorterThanSegment {
                part_secs: self.part_secs,
                segment_secs: self.segment_secs,
            });
        }
        Ok(())
    }

    /// Whole segments per part (at least one).
    pub fn segments_per_part(&self) -> usize {
        ((self.part_secs / self.segment_secs.max(1)) as usize).max(1)
    }
}

/// Service selection per recognition call (`[dispatch]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub strategy: SelectionStrategy,
    /// Services tried for one segment before the call counts as failed.
    pub max_attempts: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::WeightedRandom,
            max_attempts: 3,
        }
    }
}

/// One external recognition command (`[[services]]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Program to run; the segment path is appended as the last argument.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_weight() -> f64 {
    10.0
}

/// Checkpoint persistence backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    /// One JSON document, replaced atomically on every save.
    #[default]
    Json,
    /// SQLite table keyed by source file.
    Sqlite,
}

/// Global configuration loaded from `~/.config/scribe/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScribeConfig {
    #[serde(default)]
    pub checkpoint_backend: CheckpointBackend,
    /// Where part files and manifests are written (CLI default: current dir).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub parts: PartConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceConfig>,
}

impl ScribeConfig {
    /// Checks every section; the first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        self.parts.validate()?;
        if self.dispatch.max_attempts == 0 {
            return Err(ConfigError::NonPositive {
                field: "dispatch.max_attempts",
            });
        }
        let mut seen = HashSet::new();
        for service in &self.services {
            if !service.weight.is_finite() || service.weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: service.name.clone(),
                    weight: service.weight,
                });
            }
            if service.command.trim().is_empty() {
                return Err(ConfigError::EmptyCommand(service.name.clone()));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(ConfigError::DuplicateService(service.name.clone()));
            }
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("scribe")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ScribeConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ScribeConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Parse a config file without touching the default location.
pub fn load_from_path(path: &Path) -> Result<ScribeConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: ScribeConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
