//! Part-based processing of long recordings.
//!
//! A file's segments are grouped into contiguous parts. Each part runs
//! through the retry coordinator on its own, its text is written to
//! `part_<n>.txt`, and the job record is saved before the next part starts.
//! Once every part is done a manifest (`index.md`) ties them together.

mod manager;
mod manifest;
mod plan;
mod render;
pub mod repair;

pub use manager::{FileOutcome, PartManager};
pub use manifest::{write_manifest, MANIFEST_NAME};
pub use plan::PartPlan;
pub use render::{format_clock, render_part_text, GAP_MARKER};
pub use repair::{rebuild_manifests, RepairStats};

use std::path::{Path, PathBuf};

/// Key prefix for records rebuilt from part files with no matching record.
pub const RECONSTRUCTED_PREFIX: &str = "__reconstructed__/";

/// Part file name for zero-based `part_index` (`part_1.txt` for index 0).
pub fn part_file_name(part_index: usize) -> String {
    format!("part_{}.txt", part_index + 1)
}

/// Directory holding the part files and manifest for `file_key`.
pub fn output_dir_for(output_root: &Path, file_key: &str) -> PathBuf {
    let name = match file_key.strip_prefix(RECONSTRUCTED_PREFIX) {
        Some(rel) => Path::new(rel)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel.to_string()),
        None => Path::new(file_key)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_key.to_string()),
    };
    output_root.join(name)
}
