//! # Taxi Analytics
//!
//! Filter-and-derive pipeline for NYC yellow taxi trips, backed by a DuckDB
//! trip store.
//!
//! ## Pipeline
//!
//! - Loader: row-limited read from the store joined with the zone lookup
//! - Derivation: per-trip time parts, ratios and flags
//! - Filter: date, hour, passenger and zone predicates over an immutable table
//! - Aggregation: key metrics, grouped views, histograms and fare anomalies
//! - Presentation: chart specifications, CSV exports and reports

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod aggregates;
pub mod charts;
pub mod error;
pub mod export;
pub mod loader;
pub mod metrics;
pub mod queries;
pub mod reports;
pub mod session;
pub mod store;
pub mod table;
pub mod zones;

pub use aggregates::DashboardAggregates;
pub use charts::{ChartKind, ChartSpec, Series};
pub use error::{AnalyticsError, Result};
pub use loader::{load_enriched, CachedLoader, DuckDbTripSource, TripSource, ZoneSource};
pub use metrics::{FareAnomalies, KeyMetrics};
pub use reports::DashboardReport;
pub use session::SessionState;
pub use store::{StoredTrip, TripStore};
pub use table::TripTable;
pub use zones::{ZoneLookupFile, ZoneNames};
