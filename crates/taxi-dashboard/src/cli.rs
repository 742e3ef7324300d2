//! Command line surface of `taxi-dash`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use taxi_analytics::queries::LocationSide;
use taxi_analytics::store::DEFAULT_INGEST_LIMIT;
use taxi_analytics::SessionState;

#[derive(Parser, Debug)]
#[command(name = "taxi-dash")]
#[command(about = "NYC yellow taxi trip store and dashboard reports")]
pub struct Cli {
    /// DuckDB trip store (overrides TAXI_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Taxi zone lookup CSV (overrides ZONE_LOOKUP_PATH)
    #[arg(long, global = true)]
    pub zones: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the trip store and its tables
    InitDb,

    /// Append trips from a TLC yellow taxi CSV
    IngestCsv {
        path: PathBuf,
        #[arg(long, default_value_t = DEFAULT_INGEST_LIMIT)]
        limit: usize,
    },

    /// Append trips from a TLC yellow taxi Parquet file
    ImportParquet {
        path: PathBuf,
        #[arg(long, default_value_t = DEFAULT_INGEST_LIMIT)]
        limit: usize,
    },

    /// Convert a Parquet file to CSV with a header row
    ParquetToCsv { parquet: PathBuf, csv: PathBuf },

    /// Load the zone lookup CSV into the store
    LoadZones,

    /// Print the stored trip count and the first few trips
    Verify {
        #[arg(long, default_value_t = 5)]
        sample: usize,
    },

    /// Busiest pickup or dropoff locations in the store
    TopZones {
        #[arg(long, value_enum, default_value_t = Side::Pickup)]
        side: Side,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Trips, average fare and average tip per pickup hour
    Hourly,

    /// Filter the loaded trips and report metrics and aggregates
    Report(ReportArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Pickup,
    Dropoff,
}

impl From<Side> for LocationSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Pickup => Self::Pickup,
            Side::Dropoff => Self::Dropoff,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// First pickup date; alone it selects just that day
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last pickup date, inclusive
    #[arg(long)]
    pub end: Option<NaiveDate>,

    #[arg(long)]
    pub hour_min: Option<u32>,

    #[arg(long)]
    pub hour_max: Option<u32>,

    #[arg(long)]
    pub min_passengers: Option<u32>,

    /// Pickup zone to keep; repeat for several. All zones when omitted.
    #[arg(long = "zone", id = "zone", value_name = "ZONES")]
    pub zones: Vec<String>,

    /// Maximum trips to load (overrides TRIP_ROW_LIMIT)
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
    pub format: ReportFormat,

    /// Write the filtered trips as CSV
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Write the per-column summary as CSV
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Write chart specifications as JSON
    #[arg(long)]
    pub charts: Option<PathBuf>,
}

impl ReportArgs {
    /// Override the session selections with the values given on the
    /// command line.
    pub fn apply(&self, state: &mut SessionState) {
        match (self.start, self.end) {
            (Some(start), end) => state.select_dates(start, end),
            (None, Some(end)) => state.date_range.1 = end,
            (None, None) => {}
        }
        if let Some(h) = self.hour_min {
            state.hour_range.0 = h;
        }
        if let Some(h) = self.hour_max {
            state.hour_range.1 = h;
        }
        if let Some(p) = self.min_passengers {
            state.min_passengers = p;
        }
        if !self.zones.is_empty() {
            state.selected_zones = self.zones.iter().cloned().collect();
        }
    }
}
