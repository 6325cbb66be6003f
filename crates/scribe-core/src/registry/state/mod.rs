//! Mutex-guarded registry state and its public operations.

mod select;

use rand::Rng;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::ConfigError;

use super::entry::{CircuitTransition, ServiceEntry};
use super::snapshot::ServiceStats;
use super::strategy::SelectionStrategy;

/// Everything behind the registry lock.
#[derive(Debug, Default)]
pub(super) struct RegistryState {
    pub(super) services: Vec<ServiceEntry>,
    /// Registration position of the service last returned by round-robin.
    pub(super) round_robin_cursor: Option<usize>,
}

/// Process-lifetime registry of recognition services.
///
/// Services are registered once and never removed. Every mutation and every
/// selection happens under a single lock, so `stats()` always returns a
/// consistent snapshot.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    inner: Mutex<RegistryState>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a service with zero counters, available for selection.
    ///
    /// Weights must be finite and non-negative; names must be unique.
    pub fn register(&self, name: impl Into<String>, weight: f64) -> Result<(), ConfigError> {
        let name = name.into();
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConfigError::InvalidWeight { name, weight });
        }
        let mut state = self.lock();
        if state.services.iter().any(|s| s.name == name) {
            return Err(ConfigError::DuplicateService(name));
        }
        tracing::info!(service = %name, weight, "registered recognition service");
        state.services.push(ServiceEntry::new(name, weight));
        Ok(())
    }

    /// Record the outcome of one call. Unknown names are ignored.
    pub fn report_result(&self, name: &str, success: bool) {
        let mut state = self.lock();
        let Some(entry) = state.services.iter_mut().find(|s| s.name == name) else {
            tracing::debug!(service = name, "outcome reported for unknown service");
            return;
        };
        match entry.record(success) {
            Some(CircuitTransition::Opened) => tracing::warn!(
                service = name,
                successes = entry.success_count,
                total = entry.total_count,
                "success rate too low; circuit opened"
            ),
            Some(CircuitTransition::Closed) => {
                tracing::info!(service = name, "service recovered; circuit closed")
            }
            None => {}
        }
    }

    /// Pick a service for the next call, or None when nothing is available.
    pub fn select(&self, strategy: SelectionStrategy) -> Option<String> {
        self.select_with_rng(strategy, &mut rand::thread_rng())
    }

    /// `select` with a caller-supplied random source.
    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        strategy: SelectionStrategy,
        rng: &mut R,
    ) -> Option<String> {
        let mut state = self.lock();
        let picked = match strategy {
            SelectionStrategy::WeightedRandom => state.pick_weighted(rng),
            SelectionStrategy::RoundRobin => state.pick_round_robin(),
        }?;
        Some(state.services[picked].name.clone())
    }

    /// Count one call actually made to `name`. Unknown names are ignored.
    pub fn record_invocation(&self, name: &str) {
        let mut state = self.lock();
        if let Some(entry) = state.services.iter_mut().find(|s| s.name == name) {
            entry.invocation_count = entry.invocation_count.saturating_add(1);
        }
    }

    /// Snapshot of every service's counters, in registration order.
    pub fn stats(&self) -> Vec<ServiceStats> {
        self.lock().services.iter().map(ServiceStats::from).collect()
    }

    /// Whether `name` is currently selectable (None if unknown).
    pub fn is_available(&self, name: &str) -> Option<bool> {
        self.lock()
            .services
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.available)
    }

    pub fn len(&self) -> usize {
        self.lock().services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
