//! # Dashboard Configuration
//!
//! Environment-based configuration for the `taxi-dash` binary.

use std::env;
use std::path::PathBuf;

use taxi_analytics::loader::DEFAULT_ROW_LIMIT;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// DuckDB trip store file
    pub db_path: PathBuf,

    /// TLC taxi zone lookup CSV
    pub zone_lookup_path: PathBuf,

    /// Maximum number of trips loaded for a report
    pub row_limit: usize,

    /// Logging level, used when `RUST_LOG` is unset
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup, falling back to defaults
    /// for missing or unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            db_path: lookup("TAXI_DB_PATH")
                .map_or_else(|| PathBuf::from("db/nyc_mobility.db"), PathBuf::from),

            zone_lookup_path: lookup("ZONE_LOOKUP_PATH").map_or_else(
                || PathBuf::from("data/lookup/taxi_zone_lookup.csv"),
                PathBuf::from,
            ),

            row_limit: lookup("TRIP_ROW_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_ROW_LIMIT),

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
