//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration. Every option can also be supplied through the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use crate::config::constants::*;
use crate::error_handling::ConfigError;
use crate::throttle::ThrottleConfig;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Process-wide configuration, loaded once at startup.
///
/// Parsed from the command line (with environment fallbacks) by the binary, or
/// constructed programmatically by library users.
///
/// # Examples
///
/// ```no_run
/// use flight_proxy::Config;
///
/// let config = Config {
///     upstream_api_key: "secret".to_string(),
///     tier1_threshold: 600,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "flight_proxy",
    about = "Caching proxy for a metered flight-data API with credit-aware throttling."
)]
pub struct Config {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, env = "FLIGHT_PROXY_LOG_LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, env = "FLIGHT_PROXY_LOG_FORMAT", default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Database path (SQLite file holding the usage snapshot and cycle log)
    #[arg(long, value_parser, env = "FLIGHT_PROXY_DB_PATH", default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Address the HTTP surface listens on
    #[arg(long, env = "FLIGHT_PROXY_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Base URL of the upstream airport flights endpoint (IATA code is appended)
    #[arg(long, env = "AERODATABOX_BASE_URL", default_value = DEFAULT_UPSTREAM_BASE_URL)]
    pub upstream_base_url: String,

    /// API key sent as `X-RapidAPI-Key`
    #[arg(long, env = "AERODATABOX_API_KEY", default_value = "", hide_env_values = true)]
    pub upstream_api_key: String,

    /// Value sent as `X-RapidAPI-Host`
    #[arg(long, env = "AERODATABOX_HOST", default_value = DEFAULT_UPSTREAM_HOST)]
    pub upstream_host: String,

    /// Upstream request timeout in seconds
    #[arg(long, env = "AERODATABOX_TIMEOUT_SECONDS", default_value_t = UPSTREAM_TIMEOUT_SECS)]
    pub upstream_timeout_seconds: u64,

    /// Timeout for a single durable-store statement in seconds
    #[arg(long, env = "FLIGHT_PROXY_STORE_TIMEOUT_SECONDS", default_value_t = STORE_TIMEOUT_SECS)]
    pub store_timeout_seconds: u64,

    /// Credits available at the start of each cycle (tier 1 baseline)
    #[arg(long, env = "THROTTLE_TIER1_THRESHOLD", default_value_t = DEFAULT_TIER1_THRESHOLD)]
    pub tier1_threshold: i64,

    /// Remaining-credit threshold at or below which tier 2 applies
    #[arg(long, env = "THROTTLE_TIER2_THRESHOLD", default_value_t = DEFAULT_TIER2_THRESHOLD)]
    pub tier2_threshold: i64,

    /// Remaining-credit threshold at or below which tier 3 applies
    #[arg(long, env = "THROTTLE_TIER3_THRESHOLD", default_value_t = DEFAULT_TIER3_THRESHOLD)]
    pub tier3_threshold: i64,

    /// Minimum refresh interval in tier 1 (seconds)
    #[arg(long, env = "THROTTLE_TIER1_INTERVAL_SECONDS", default_value_t = DEFAULT_TIER1_INTERVAL_SECS)]
    pub tier1_interval_seconds: u64,

    /// Minimum refresh interval in tier 2 (seconds)
    #[arg(long, env = "THROTTLE_TIER2_INTERVAL_SECONDS", default_value_t = DEFAULT_TIER2_INTERVAL_SECS)]
    pub tier2_interval_seconds: u64,

    /// Minimum refresh interval in tier 3 (seconds)
    #[arg(long, env = "THROTTLE_TIER3_INTERVAL_SECONDS", default_value_t = DEFAULT_TIER3_INTERVAL_SECS)]
    pub tier3_interval_seconds: u64,

    /// Subscription anchor date (YYYY-MM-DD); a new cycle starts on its day of every month
    #[arg(long, env = "THROTTLE_SUBSCRIPTION_START_DATE")]
    pub subscription_start_date: Option<NaiveDate>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            upstream_api_key: String::new(),
            upstream_host: DEFAULT_UPSTREAM_HOST.to_string(),
            upstream_timeout_seconds: UPSTREAM_TIMEOUT_SECS,
            store_timeout_seconds: STORE_TIMEOUT_SECS,
            tier1_threshold: DEFAULT_TIER1_THRESHOLD,
            tier2_threshold: DEFAULT_TIER2_THRESHOLD,
            tier3_threshold: DEFAULT_TIER3_THRESHOLD,
            tier1_interval_seconds: DEFAULT_TIER1_INTERVAL_SECS,
            tier2_interval_seconds: DEFAULT_TIER2_INTERVAL_SECS,
            tier3_interval_seconds: DEFAULT_TIER3_INTERVAL_SECS,
            subscription_start_date: None,
        }
    }
}

impl Config {
    /// Builds and validates the throttle configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the thresholds are not strictly descending or the
    /// intervals are not strictly ascending.
    pub fn throttle_config(&self) -> Result<ThrottleConfig, ConfigError> {
        let config = ThrottleConfig {
            tier1_threshold: self.tier1_threshold,
            tier2_threshold: self.tier2_threshold,
            tier3_threshold: self.tier3_threshold,
            tier1_interval: Duration::from_secs(self.tier1_interval_seconds),
            tier2_interval: Duration::from_secs(self.tier2_interval_seconds),
            tier3_interval: Duration::from_secs(self.tier3_interval_seconds),
            subscription_start: self.subscription_start_date,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_default_matches_cli_defaults() {
        let parsed = Config::try_parse_from(["flight_proxy"]).expect("defaults should parse");
        let default = Config::default();
        assert_eq!(parsed.db_path, default.db_path);
        assert_eq!(parsed.listen_addr, default.listen_addr);
        assert_eq!(parsed.tier1_threshold, default.tier1_threshold);
        assert_eq!(parsed.tier3_interval_seconds, default.tier3_interval_seconds);
        assert_eq!(parsed.upstream_host, default.upstream_host);
    }

    #[test]
    fn test_parse_subscription_start_date() {
        let parsed = Config::try_parse_from([
            "flight_proxy",
            "--subscription-start-date",
            "2025-01-15",
        ])
        .expect("date should parse");
        assert_eq!(
            parsed.subscription_start_date,
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let result = Config::try_parse_from([
            "flight_proxy",
            "--subscription-start-date",
            "15/01/2025",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_throttle_config_without_anchor() {
        let throttle = Config::default().throttle_config().unwrap();
        assert_eq!(throttle.subscription_start, None);
        assert_eq!(throttle.tier2_interval, Duration::from_secs(240));
    }

    #[test]
    fn test_throttle_config_rejects_unordered_thresholds() {
        let config = Config {
            tier2_threshold: 1000,
            ..Default::default()
        };
        assert!(matches!(
            config.throttle_config(),
            Err(ConfigError::ThresholdsNotDescending { .. })
        ));
    }
}
