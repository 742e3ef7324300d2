//! Analytics error types.

use thiserror::Error;

/// Analytics errors.
///
/// An empty filter result is not an error: metrics over zero rows have a
/// defined no-data state.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Trip store unreachable or unreadable while loading
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// A row in the loaded batch could not be derived; the whole load fails
    #[error("Malformed input at row {row}: {reason}")]
    MalformedInput {
        /// Zero-based position in the loaded batch
        row: usize,
        /// What was wrong with it
        reason: String,
    },

    /// DuckDB error
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<taxi_domain::DomainError> for AnalyticsError {
    fn from(err: taxi_domain::DomainError) -> Self {
        Self::InvalidParameter(err.to_string())
    }
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
