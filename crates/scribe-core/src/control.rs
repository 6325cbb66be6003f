//! Interrupt coordination: one shared flag observed by every long-running loop.
//!
//! The scheduler polls the flag on every loop iteration, the retry
//! coordinator before each round, the part manager before each part and the
//! dispatcher before each provider attempt. Observing it never raises; each
//! loop stops submitting work, cancels what it can, and returns the partial
//! state it holds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to a process-wide interrupt flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that all work stop at the next poll point.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// Raise `flag` when the process receives Ctrl-C. Must be called inside a tokio runtime.
pub fn install_ctrl_c_handler(flag: InterruptFlag) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("interrupt received; finishing the current poll cycle");
                flag.raise();
            }
            Err(e) => tracing::warn!("could not listen for Ctrl-C: {}", e),
        }
    })
}
