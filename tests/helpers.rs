// Shared test helpers for the integration tests.
//
// Each test file includes this with `mod helpers;`, so not every helper is
// used by every file.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use flight_proxy::usage::ManualClock;
use flight_proxy::{Config, LogFormat, LogLevel};

/// Path the upstream client requests under the mock server.
pub const UPSTREAM_PATH: &str = "/flights/airports/iata/";

/// A config pointing at a mock upstream and an on-disk database.
pub fn test_config(db_path: &Path, upstream_uri: &str) -> Config {
    Config {
        log_level: LogLevel::Error,
        log_format: LogFormat::Plain,
        db_path: db_path.to_path_buf(),
        listen_addr: "127.0.0.1:0".parse().expect("valid address"),
        upstream_base_url: format!("{}{}", upstream_uri, UPSTREAM_PATH),
        upstream_api_key: "test-key".to_string(),
        upstream_host: "aerodatabox.test".to_string(),
        upstream_timeout_seconds: 2,
        subscription_start_date: Some(date(2025, 1, 15)),
        ..Default::default()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn instant(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .expect("valid instant")
}

pub fn manual_clock(at: DateTime<Utc>) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(at))
}

/// AeroDataBox-style departures document with flights scheduled at the
/// given offsets (minutes) from `now`, using the space-separated timestamp form.
pub fn departures_body(now: DateTime<Utc>, offsets: &[(&str, i64)]) -> String {
    let records: Vec<String> = offsets
        .iter()
        .map(|(number, offset)| {
            let at = now + TimeDelta::minutes(*offset);
            format!(
                r#"{{
                    "movement": {{
                        "airport": {{"iata": "LHR", "name": "London"}},
                        "scheduledTime": {{"utc": "{}Z", "local": "{}+00:00"}},
                        "terminal": "2",
                        "quality": ["Basic"]
                    }},
                    "number": "{}",
                    "status": "Expected",
                    "airline": {{"name": "KLM"}},
                    "aircraft": {{"model": "Embraer 190"}}
                }}"#,
                at.format("%Y-%m-%d %H:%M"),
                at.format("%Y-%m-%d %H:%M"),
                number
            )
        })
        .collect();
    format!(r#"{{"departures": [{}]}}"#, records.join(","))
}
