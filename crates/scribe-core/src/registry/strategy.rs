//! Selection strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How `ServiceRegistry::select` picks among available services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Draw proportionally to weight; falls back to round-robin when all
    /// available weights are zero.
    #[default]
    WeightedRandom,
    /// Cycle through available services in registration order.
    RoundRobin,
}

impl SelectionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionStrategy::WeightedRandom => "weighted_random",
            SelectionStrategy::RoundRobin => "round_robin",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weighted_random" | "weighted-random" => Ok(SelectionStrategy::WeightedRandom),
            "round_robin" | "round-robin" => Ok(SelectionStrategy::RoundRobin),
            other => Err(format!("unknown selection strategy: {}", other)),
        }
    }
}
