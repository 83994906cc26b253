//! Upstream timestamp parsing.
//!
//! AeroDataBox sends local and UTC times such as `2025-11-22 10:30+00:00` or
//! `2025-11-22 10:30Z`: a space instead of `T`, and seconds are often left out.
//! Both that form and strict RFC 3339 are accepted.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};

/// Parses an upstream timestamp, returning `None` when no supported form matches.
pub fn parse_upstream_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    let mut normalized = trimmed.replacen(' ', "T", 1);
    if let Some(stripped) = normalized.strip_suffix('Z') {
        normalized = format!("{stripped}+00:00");
    }

    DateTime::parse_from_rfc3339(&normalized)
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z"))
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f%:z"))
        .ok()
}

/// `deserialize_with` adapter: null, missing and blank values become `None`;
/// anything else must parse or the whole document is rejected.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_upstream_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
    }
}
