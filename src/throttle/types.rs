//! Throttle configuration and tier types.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error_handling::ConfigError;

/// Interval regime selected by remaining credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier1 => "tier1",
            Tier::Tier2 => "tier2",
            Tier::Tier3 => "tier3",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Throttle thresholds, intervals and the subscription anchor.
///
/// Immutable for the life of the process. Use [`ThrottleConfig::validate`]
/// before handing it to the usage coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Credits available at the start of a cycle
    pub tier1_threshold: i64,
    pub tier2_threshold: i64,
    pub tier3_threshold: i64,
    pub tier1_interval: Duration,
    pub tier2_interval: Duration,
    pub tier3_interval: Duration,
    /// Anchor date cycle boundaries are counted from. Without one, each cycle
    /// runs one calendar month from its own start.
    pub subscription_start: Option<NaiveDate>,
}

impl ThrottleConfig {
    /// Checks `tier1 > tier2 > tier3 >= 0` and `interval1 < interval2 < interval3`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tier1_threshold > self.tier2_threshold
            && self.tier2_threshold > self.tier3_threshold
            && self.tier3_threshold >= 0)
        {
            return Err(ConfigError::ThresholdsNotDescending {
                tier1: self.tier1_threshold,
                tier2: self.tier2_threshold,
                tier3: self.tier3_threshold,
            });
        }

        if !(self.tier1_interval < self.tier2_interval && self.tier2_interval < self.tier3_interval)
        {
            return Err(ConfigError::IntervalsNotAscending {
                tier1: self.tier1_interval,
                tier2: self.tier2_interval,
                tier3: self.tier3_interval,
            });
        }

        Ok(())
    }

    /// Minimum refresh interval for a tier.
    pub fn interval(&self, tier: Tier) -> Duration {
        match tier {
            Tier::Tier1 => self.tier1_interval,
            Tier::Tier2 => self.tier2_interval,
            Tier::Tier3 => self.tier3_interval,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> ThrottleConfig {
    ThrottleConfig {
        tier1_threshold: 1000,
        tier2_threshold: 500,
        tier3_threshold: 250,
        tier1_interval: Duration::from_secs(120),
        tier2_interval: Duration::from_secs(240),
        tier3_interval: Duration::from_secs(480),
        subscription_start: NaiveDate::from_ymd_opt(2025, 1, 15),
    }
}
