//! Error types shared by the engine.
//!
//! `ConfigError` is the only class the engine raises on its own, and only
//! while a component is being built. Failures inside a batch are absorbed
//! into batch statistics; `TransportError` exists so providers can say why
//! a single call failed.

use thiserror::Error;

/// Misconfiguration detected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("worker pool size must be at least 1")]
    ZeroWorkers,
    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },
    #[error("poll interval of {0}ms exceeds the 1000ms interrupt latency bound")]
    PollIntervalTooLong(u64),
    #[error("{field} must be in (0, 1], got {value}")]
    RatioOutOfRange { field: &'static str, value: f64 },
    #[error("part length ({part_secs}s) is shorter than one segment ({segment_secs}s)")]
    PartShorterThanSegment { part_secs: u64, segment_secs: u64 },
    #[error("service {name:?} has invalid weight {weight}")]
    InvalidWeight { name: String, weight: f64 },
    #[error("service {0:?} is registered twice")]
    DuplicateService(String),
    #[error("service {0:?} has an empty command")]
    EmptyCommand(String),
}

/// A single recognition call failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The provider process could not be started.
    #[error("failed to start provider: {0}")]
    Spawn(#[source] std::io::Error),
    /// The provider ran but reported failure.
    #[error("provider exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("provider I/O: {0}")]
    Io(#[from] std::io::Error),
    /// Free-form failure reported by a provider implementation.
    #[error("{0}")]
    Provider(String),
}
