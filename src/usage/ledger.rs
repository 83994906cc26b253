//! The usage ledger: credit consumption for the active subscription cycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::cycle::cycle_end_for;
use crate::storage::UsageLogEntry;

/// Calls made in the current cycle and the cycle's inclusive bounds.
///
/// Owned by the [`UsageCoordinator`](super::UsageCoordinator); never deleted,
/// only rolled forward in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageState {
    pub calls_this_cycle: u64,
    pub cycle_start: NaiveDate,
    /// Inclusive: one calendar month minus one day after `cycle_start`
    pub cycle_end: NaiveDate,
}

impl UsageState {
    /// A zero-usage cycle starting on `today`.
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            calls_this_cycle: 0,
            cycle_start: today,
            cycle_end: cycle_end_for(today),
        }
    }

    /// Whether `today` lies past the end of this cycle.
    pub fn is_closed(&self, today: NaiveDate) -> bool {
        today > self.cycle_end
    }

    /// Whether the bounds are ordered. A persisted snapshot failing this is corrupt.
    pub fn is_consistent(&self) -> bool {
        self.cycle_start <= self.cycle_end
    }

    /// Durable record closing out this cycle.
    pub fn closing_entry(&self, logged_at: DateTime<Utc>) -> UsageLogEntry {
        UsageLogEntry {
            calls_this_cycle: self.calls_this_cycle,
            cycle_start: self.cycle_start,
            cycle_end: self.cycle_end,
            logged_at,
        }
    }

    /// Ends this cycle the day before `boundary`, the next cycle's start.
    pub fn end_before(&mut self, boundary: NaiveDate) {
        self.cycle_end = boundary
            .pred_opt()
            .unwrap_or(self.cycle_start)
            .max(self.cycle_start);
    }

    /// Opens the following cycle: starts the day after the current end, zero calls.
    pub fn advance(&mut self) {
        let start = self.cycle_end.succ_opt().unwrap_or(self.cycle_end);
        self.calls_this_cycle = 0;
        self.cycle_start = start;
        self.cycle_end = cycle_end_for(start);
    }
}
