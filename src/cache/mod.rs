//! Cache freshness gate.
//!
//! Decides per `(location, direction)` whether the cached flight list is
//! still fresh under the current throttle interval or must be refreshed from
//! upstream, and charges the usage ledger only for refreshes that reached it.

mod gate;

pub use gate::{CacheKey, FreshnessGate};
