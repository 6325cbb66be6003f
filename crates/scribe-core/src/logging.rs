//! Logging init: file under XDG state dir, or graceful fallback to stderr.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,scribe=debug,scribe_core=debug";
const LOG_FILE_NAME: &str = "scribe.log";

/// Environment variable that moves the log file away from the state dir.
pub const LOG_FILE_ENV: &str = "SCRIBE_LOG_FILE";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn resolve_log_path(override_path: Option<OsString>, state_home: &Path) -> PathBuf {
    match override_path {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => state_home.join(LOG_FILE_NAME),
    }
}

/// Where `init_logging` writes: `$SCRIBE_LOG_FILE`, else
/// `~/.local/state/scribe/scribe.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let state_home = xdg::BaseDirectories::with_prefix("scribe")?.get_state_home();
    Ok(resolve_log_path(std::env::var_os(LOG_FILE_ENV), &state_home))
}

/// Initialize structured logging to `log_file_path()`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging() -> Result<()> {
    init_logging_at(&log_file_path()?)
}

/// Append structured logs to `path`, creating its directory.
pub fn init_logging_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {}", e))?;

    tracing::info!(path = %path.display(), "scribe logging initialized");
    Ok(())
}

/// Initialize logging to stderr only (no file). Use when init_logging() fails so the CLI doesn't crash.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_defaults_to_state_home() {
        let home = Path::new("/home/u/.local/state/scribe");
        assert_eq!(resolve_log_path(None, home), home.join("scribe.log"));
        assert_eq!(
            resolve_log_path(Some(OsString::new()), home),
            home.join("scribe.log")
        );
    }

    #[test]
    fn log_path_override_wins() {
        let home = Path::new("/home/u/.local/state/scribe");
        assert_eq!(
            resolve_log_path(Some(OsString::from("/var/log/scribe/run.log")), home),
            PathBuf::from("/var/log/scribe/run.log")
        );
    }
}
