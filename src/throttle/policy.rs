//! Pure mapping from cycle consumption to refresh interval.

use std::time::Duration;

use super::types::{ThrottleConfig, Tier};

/// Credits left in the cycle. Not clamped: overspending yields a negative value.
pub fn credits_remaining(calls_this_cycle: u64, config: &ThrottleConfig) -> i64 {
    let calls = i64::try_from(calls_this_cycle).unwrap_or(i64::MAX);
    config.tier1_threshold.saturating_sub(calls)
}

/// Selects the tier for the given consumption.
pub fn tier_for(calls_this_cycle: u64, config: &ThrottleConfig) -> Tier {
    let remaining = credits_remaining(calls_this_cycle, config);

    if remaining > config.tier2_threshold {
        Tier::Tier1
    } else if remaining > config.tier3_threshold {
        Tier::Tier2
    } else {
        Tier::Tier3
    }
}

/// Minimum interval between upstream refreshes of the same cache key.
pub fn tier_interval_for(calls_this_cycle: u64, config: &ThrottleConfig) -> Duration {
    config.interval(tier_for(calls_this_cycle, config))
}
