//! Credit-aware throttle policy.
//!
//! Maps the number of upstream calls made in the current subscription cycle to
//! a minimum refresh interval. The tighter the remaining budget, the longer
//! cached data is served before upstream is contacted again:
//!
//! | remaining credits            | tier   |
//! |------------------------------|--------|
//! | `> tier2_threshold`          | Tier 1 |
//! | `> tier3_threshold`          | Tier 2 |
//! | otherwise (may be negative)  | Tier 3 |

mod policy;
mod types;

pub use policy::{credits_remaining, tier_for, tier_interval_for};
pub use types::{ThrottleConfig, Tier};

#[cfg(test)]
pub(crate) use types::test_config;
