//! Read-only view of registry counters.

use serde::Serialize;
use std::fmt;

use super::entry::ServiceEntry;

/// Snapshot of one service's counters, taken under the registry lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub name: String,
    pub weight: f64,
    pub invocation_count: u64,
    pub success_count: u64,
    pub total_count: u64,
    /// Percentage in [0, 100]; 0 before the first outcome.
    pub success_rate: f64,
    pub available: bool,
}

impl From<&ServiceEntry> for ServiceStats {
    fn from(entry: &ServiceEntry) -> Self {
        Self {
            name: entry.name.clone(),
            weight: entry.weight,
            invocation_count: entry.invocation_count,
            success_count: entry.success_count,
            total_count: entry.total_count,
            success_rate: entry.success_rate().unwrap_or(0.0) * 100.0,
            available: entry.available,
        }
    }
}

impl fmt::Display for ServiceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} calls, {}/{} ok ({:.1}%){}",
            self.name,
            self.invocation_count,
            self.success_count,
            self.total_count,
            self.success_rate,
            if self.available { "" } else { " [circuit open]" }
        )
    }
}
