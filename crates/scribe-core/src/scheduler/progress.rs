//! Progress reporting for scheduler batches.
//!
//! The scheduler reports once per finished segment and once more when the
//! batch ends, always with a non-decreasing `current` and a final call where
//! `current == total`.

use tokio::sync::mpsc;

/// Receives batch progress. Must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, current: usize, total: usize, message: &str);
}

/// One progress report (CLI-friendly).
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

impl ProgressUpdate {
    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.current as f64 / self.total as f64).min(1.0)
    }
}

/// Logs progress at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, current: usize, total: usize, message: &str) {
        tracing::debug!(current, total, "{}", message);
    }
}

/// Forwards progress into a channel; drops updates when the receiver lags.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::Sender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, current: usize, total: usize, message: &str) {
        let _ = self.tx.try_send(ProgressUpdate {
            current,
            total,
            message: message.to_string(),
        });
    }
}
