//! Multi-round retry of failed segments.
//!
//! After the initial scheduler pass, segments without text are resubmitted
//! as a fresh batch for up to `max_retries` rounds. Rounds run one after
//! another; a segment that succeeded is never resubmitted. Segments that fail
//! every round stay absent from the result map and are only counted.

mod coordinator;
mod stats;

pub use coordinator::RetryCoordinator;
pub use stats::{RetryReport, RetryStats, RoundSummary};

#[cfg(test)]
mod tests;
