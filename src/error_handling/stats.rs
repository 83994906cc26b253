//! Gate outcome statistics.
//!
//! Thread-safe counters for every pass through the cache freshness gate, shared
//! between request tasks and the usage endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::OutcomeType;

/// Thread-safe outcome statistics tracker.
///
/// All outcome types are initialized to zero on creation, so increments never
/// allocate and reads never miss.
pub struct OutcomeStats {
    outcomes: HashMap<OutcomeType, AtomicUsize>,
}

impl OutcomeStats {
    pub fn new() -> Self {
        let mut outcomes = HashMap::new();
        for outcome in OutcomeType::iter() {
            outcomes.insert(outcome, AtomicUsize::new(0));
        }
        OutcomeStats { outcomes }
    }

    /// Increment an outcome counter.
    pub fn increment(&self, outcome: OutcomeType) {
        if let Some(counter) = self.outcomes.get(&outcome) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment outcome counter for {:?} which is not in the map. \
                 This indicates a bug in OutcomeStats initialization.",
                outcome
            );
        }
    }

    pub fn get_count(&self, outcome: OutcomeType) -> usize {
        self.outcomes
            .get(&outcome)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Total number of gate passes recorded.
    pub fn total(&self) -> usize {
        self.outcomes
            .values()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    /// Number of recorded passes that reached the upstream API.
    pub fn upstream_calls(&self) -> usize {
        self.total()
            - self.get_count(OutcomeType::CacheHit)
            - self.get_count(OutcomeType::SharedRefresh)
    }

    /// Snapshot of all counters keyed by their stable names.
    pub fn snapshot(&self) -> HashMap<&'static str, usize> {
        OutcomeType::iter()
            .map(|outcome| (outcome.as_str(), self.get_count(outcome)))
            .collect()
    }
}

impl Default for OutcomeStats {
    fn default() -> Self {
        Self::new()
    }
}
