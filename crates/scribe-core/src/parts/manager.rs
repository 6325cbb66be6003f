use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::manifest::write_manifest;
use super::plan::PartPlan;
use super::render::render_part_text;
use super::{output_dir_for, part_file_name};
use crate::checkpoint::{CheckpointStore, JobRecord, SegmentStats};
use crate::config::PartConfig;
use crate::error::ConfigError;
use crate::retry::RetryCoordinator;
use crate::segment::Segment;
use crate::splitter::AudioSplitter;
use crate::storage::atomic_write_async;

/// What one `process_file` call did.
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub file_key: String,
    pub total_parts: usize,
    /// Zero-based parts completed by this call.
    pub processed_parts: Vec<usize>,
    /// Parts that were already complete when the call started.
    pub already_done: usize,
    pub completed: bool,
    pub interrupted: bool,
    pub manifest: Option<PathBuf>,
    /// Segment counts over the parts processed by this call.
    pub stats: SegmentStats,
}

/// Runs a file part by part and checkpoints after each one.
pub struct PartManager {
    coordinator: Arc<RetryCoordinator>,
    store: Arc<dyn CheckpointStore>,
    config: PartConfig,
    output_root: PathBuf,
}

impl PartManager {
    pub fn new(
        coordinator: Arc<RetryCoordinator>,
        store: Arc<dyn CheckpointStore>,
        config: PartConfig,
        output_root: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            coordinator,
            store,
            config,
            output_root: output_root.into(),
        })
    }

    /// Split `source` with `splitter` and process the result.
    pub async fn process_source(
        &self,
        splitter: &dyn AudioSplitter,
        source: &Path,
    ) -> Result<FileOutcome> {
        let duration = splitter.duration_secs(source).await?;
        let segments = splitter.split(source).await?;
        let key = source.to_string_lossy();
        self.process_file(&key, duration, &segments).await
    }

    /// Process every pending part of `file_key`, resuming from its stored record.
    ///
    /// Completed parts are never reprocessed. The interrupt flag is checked
    /// before each part; a part cut short by an interrupt is not recorded.
    pub async fn process_file(
        &self,
        file_key: &str,
        duration_secs: f64,
        segment_paths: &[PathBuf],
    ) -> Result<FileOutcome> {
        let plan = PartPlan::new(duration_secs, segment_paths.len(), &self.config);
        let mut record = self.load_or_create(file_key, duration_secs, &plan).await?;
        let out_dir = output_dir_for(&self.output_root, file_key);
        let interrupt = self.coordinator.scheduler().interrupt();

        let pending = record.pending_parts();
        let mut outcome = FileOutcome {
            file_key: file_key.to_string(),
            total_parts: plan.total_parts,
            already_done: plan.total_parts - pending.len(),
            ..FileOutcome::default()
        };
        tracing::info!(
            file = file_key,
            parts = plan.total_parts,
            pending = pending.len(),
            segments = segment_paths.len(),
            "processing file"
        );

        for part in pending {
            if interrupt.is_raised() {
                tracing::warn!(file = file_key, part = part + 1, "interrupt observed before part");
                outcome.interrupted = true;
                break;
            }
            let range = plan.range(part);
            let mut segments: Vec<Segment> = range
                .clone()
                .map(|i| Segment::new(i, segment_paths[i].clone()))
                .collect();
            tracing::info!(
                file = file_key,
                part = part + 1,
                total = plan.total_parts,
                segments = segments.len(),
                "processing part"
            );

            let report = self.coordinator.transcribe(&mut segments).await;
            if report.interrupted {
                tracing::warn!(file = file_key, part = part + 1, "part interrupted; not recorded");
                outcome.interrupted = true;
                break;
            }

            let text = render_part_text(
                segments
                    .iter()
                    .map(|s| (s.index, report.results.get(&s.index).map(String::as_str))),
                self.config.segment_secs,
            );
            let part_path = out_dir.join(part_file_name(part));
            atomic_write_async(&part_path, text.into_bytes())
                .await
                .with_context(|| format!("write part {} of {}", part + 1, file_key))?;

            let stats = SegmentStats {
                successful: report.stats.success_count,
                total: report.stats.total_count,
            };
            record.mark_part_completed(part, part_path, stats);
            self.store
                .save(file_key, &record)
                .await
                .with_context(|| format!("save checkpoint for {}", file_key))?;
            tracing::info!(
                file = file_key,
                part = part + 1,
                recognized = stats.successful,
                segments = stats.total,
                "part completed"
            );
            outcome.processed_parts.push(part);
            outcome.stats += stats;
        }

        if outcome.interrupted {
            record.interrupted = true;
            record.touch();
            self.store
                .save(file_key, &record)
                .await
                .with_context(|| format!("save checkpoint for {}", file_key))?;
        } else if record.completed {
            if record.interrupted || !outcome.processed_parts.is_empty() {
                record.interrupted = false;
                self.store
                    .save(file_key, &record)
                    .await
                    .with_context(|| format!("save checkpoint for {}", file_key))?;
            }
            let manifest_path = out_dir.join(super::MANIFEST_NAME);
            if !outcome.processed_parts.is_empty() || !manifest_path.exists() {
                outcome.manifest = write_manifest(&out_dir, &record, self.config.part_secs)
                    .await
                    .with_context(|| format!("write manifest for {}", file_key))?;
            } else {
                outcome.manifest = Some(manifest_path);
            }
        }
        outcome.completed = record.completed;
        Ok(outcome)
    }

    async fn load_or_create(
        &self,
        file_key: &str,
        duration_secs: f64,
        plan: &PartPlan,
    ) -> Result<JobRecord> {
        let filename = Path::new(file_key)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_key.to_string());
        let stored = self
            .store
            .load(file_key)
            .await
            .with_context(|| format!("load checkpoint for {}", file_key))?;
        let mut record = match stored {
            Some(r) if r.total_parts == plan.total_parts => r,
            Some(r) if r.completed_parts() > 0 => bail!(
                "{}: stored record has {} parts but the file now plans {}; \
                 refusing to mix part layouts",
                file_key,
                r.total_parts,
                plan.total_parts
            ),
            Some(r) => {
                tracing::info!(
                    file = file_key,
                    stored = r.total_parts,
                    planned = plan.total_parts,
                    "discarding empty record with a different part count"
                );
                JobRecord::new(filename.clone(), duration_secs, plan.total_parts)
            }
            None => JobRecord::new(filename.clone(), duration_secs, plan.total_parts),
        };
        record.filename = filename;
        record.total_duration_secs = duration_secs;
        record.refresh_completed();
        Ok(record)
    }
}
