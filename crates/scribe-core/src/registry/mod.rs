//! Recognition service registry.
//!
//! Tracks per-service health and picks one service per recognition call:
//! - call counters (invocations, successes, total outcomes)
//! - a success-rate circuit breaker that removes a failing service from
//!   selection and re-admits it after a single success
//! - weighted-random or round-robin selection over available services
//!
//! All state lives behind one lock inside `ServiceRegistry`; callers only see
//! snapshots.

mod entry;
mod snapshot;
mod state;
mod strategy;

pub use entry::{CircuitTransition, ServiceEntry};
pub use snapshot::ServiceStats;
pub use state::ServiceRegistry;
pub use strategy::SelectionStrategy;
