//! Per-service counters and circuit state.

/// A service opens its circuit once it has more than this many outcomes...
pub(super) const MIN_OUTCOMES_BEFORE_TRIP: u64 = 5;
/// ...and its success rate is below this.
pub(super) const TRIP_SUCCESS_RATE: f64 = 0.2;

/// Change of a service's availability caused by one reported outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitTransition {
    /// Success rate dropped too low; the service is excluded from selection.
    Opened,
    /// A success arrived while excluded; the service is selectable again.
    Closed,
}

/// Counters and availability for one registered service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEntry {
    pub name: String,
    pub weight: f64,
    /// Calls made to this service; a selection the dispatcher skips is not one.
    pub invocation_count: u64,
    pub success_count: u64,
    /// Reported outcomes (successes and failures).
    pub total_count: u64,
    pub available: bool,
}

impl ServiceEntry {
    pub(super) fn new(name: String, weight: f64) -> Self {
        Self {
            name,
            weight,
            invocation_count: 0,
            success_count: 0,
            total_count: 0,
            available: true,
        }
    }

    /// Success rate in [0, 1], or None before the first outcome.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_count == 0 {
            return None;
        }
        Some(self.success_count as f64 / self.total_count as f64)
    }

    /// Apply one call outcome and return the circuit transition it caused.
    pub(super) fn record(&mut self, success: bool) -> Option<CircuitTransition> {
        self.total_count = self.total_count.saturating_add(1);
        if success {
            self.success_count = self.success_count.saturating_add(1);
            if !self.available {
                self.available = true;
                return Some(CircuitTransition::Closed);
            }
            return None;
        }
        let rate = self.success_rate().unwrap_or(0.0);
        if self.available && self.total_count > MIN_OUTCOMES_BEFORE_TRIP && rate < TRIP_SUCCESS_RATE
        {
            self.available = false;
            return Some(CircuitTransition::Opened);
        }
        None
    }
}
