//! Selection algorithms over the locked state.

use rand::Rng;

use super::RegistryState;

impl RegistryState {
    /// Next available service after the last round-robin pick, in
    /// registration order. Keyed by position rather than by an index into
    /// the available subset, so every available service is visited once per
    /// cycle even when availability changes between calls.
    pub(super) fn pick_round_robin(&mut self) -> Option<usize> {
        let n = self.services.len();
        let start = self.round_robin_cursor.map(|c| c + 1).unwrap_or(0);
        let picked = (0..n)
            .map(|k| (start + k) % n)
            .find(|&i| self.services[i].available)?;
        self.round_robin_cursor = Some(picked);
        Some(picked)
    }

    /// Draw uniformly over the summed weight of available services and walk
    /// them until the draw is covered.
    pub(super) fn pick_weighted<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let available: Vec<usize> = (0..self.services.len())
            .filter(|&i| self.services[i].available)
            .collect();
        if available.is_empty() {
            return None;
        }
        let mut scale = 1.0;
        let mut total: f64 = available.iter().map(|&i| self.services[i].weight).sum();
        if total <= 0.0 {
            tracing::debug!("all available weights are zero; using round-robin");
            return self.pick_round_robin();
        }
        if !total.is_finite() {
            // Finite weights whose sum overflows: draw over weights relative
            // to the largest one instead.
            scale = available
                .iter()
                .map(|&i| self.services[i].weight)
                .fold(0.0, f64::max);
            total = available
                .iter()
                .map(|&i| self.services[i].weight / scale)
                .sum();
        }

        let draw = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        let mut last_weighted = None;
        for &i in &available {
            let weight = self.services[i].weight / scale;
            if weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            last_weighted = Some(i);
            if draw < cumulative {
                return Some(i);
            }
        }
        // Float rounding can leave the draw a hair above the final sum.
        last_weighted
    }
}
