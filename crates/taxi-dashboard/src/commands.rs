//! Command execution. Output goes to the given writer; logs go to stderr.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use taxi_analytics::charts::{dashboard_charts, export_charts};
use taxi_analytics::export::{export_summary, export_trips};
use taxi_analytics::zones::ZoneLookupFile;
use taxi_analytics::{CachedLoader, DashboardReport, DuckDbTripSource, SessionState, TripStore};
use tracing::info;

use crate::cli::{Cli, Command, ReportArgs, ReportFormat};
use crate::config::Config;

/// Resolved store and lookup locations for one invocation.
#[derive(Debug, Clone)]
pub struct Paths {
    pub db: PathBuf,
    pub zones: PathBuf,
}

impl Paths {
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            db: cli.db.clone().unwrap_or_else(|| config.db_path.clone()),
            zones: cli.zones.clone().unwrap_or_else(|| config.zone_lookup_path.clone()),
        }
    }
}

pub fn run<W: Write>(cli: &Cli, config: &Config, out: &mut W) -> Result<()> {
    let paths = Paths::resolve(cli, config);

    match &cli.command {
        Command::InitDb => {
            TripStore::open(&paths.db)?;
            writeln!(out, "Trip store ready at {}", paths.db.display())?;
        }
        Command::IngestCsv { path, limit } => {
            let store = TripStore::open(&paths.db)?;
            let count = store
                .ingest_yellow_csv(path, *limit)
                .with_context(|| format!("ingesting {}", path.display()))?;
            writeln!(out, "Inserted {count} trips from {}", path.display())?;
        }
        Command::ImportParquet { path, limit } => {
            let store = TripStore::open(&paths.db)?;
            let count = store
                .import_yellow_parquet(path, *limit)
                .with_context(|| format!("importing {}", path.display()))?;
            writeln!(out, "Inserted {count} trips from {}", path.display())?;
        }
        Command::ParquetToCsv { parquet, csv } => {
            let store = TripStore::open_in_memory()?;
            store.parquet_to_csv(parquet, csv)?;
            writeln!(out, "Wrote {}", csv.display())?;
        }
        Command::LoadZones => {
            let entries = ZoneLookupFile::new(&paths.zones)
                .read_entries()
                .with_context(|| format!("reading {}", paths.zones.display()))?;
            let store = TripStore::open(&paths.db)?;
            let count = store.ingest_zones(&entries)?;
            writeln!(out, "Loaded {count} zones")?;
        }
        Command::Verify { sample } => {
            let store = TripStore::open_read_only(&paths.db)?;
            writeln!(out, "Trips in store: {}", store.trip_count()?)?;
            for trip in store.sample_trips(*sample)? {
                writeln!(
                    out,
                    "{} -> {} | {} mi | ${:.2} | PU {} DO {}",
                    trip.pickup_datetime,
                    trip.dropoff_datetime,
                    trip.trip_distance,
                    trip.fare_amount,
                    trip.pickup_location_id,
                    trip.dropoff_location_id
                )?;
            }
        }
        Command::TopZones { side, limit } => {
            let store = TripStore::open_read_only(&paths.db)?;
            for row in store.top_locations((*side).into(), *limit)? {
                let zone = row.zone.unwrap_or_else(|| "Unknown".to_string());
                writeln!(out, "{:>4} {:<40} {}", row.location_id, zone, row.trip_count)?;
            }
        }
        Command::Hourly => {
            let store = TripStore::open_read_only(&paths.db)?;
            writeln!(out, "hour  trips  avg_fare  avg_tip")?;
            for h in store.hourly_profile()? {
                writeln!(
                    out,
                    "{:>4} {:>6} {:>9.2} {:>8.2}",
                    h.hour, h.trip_count, h.avg_fare, h.avg_tip
                )?;
            }
        }
        Command::Report(args) => report(args, &paths, config, out)?,
    }

    Ok(())
}

/// Load, filter, aggregate and render once.
fn report<W: Write>(args: &ReportArgs, paths: &Paths, config: &Config, out: &mut W) -> Result<()> {
    let limit = args.limit.unwrap_or(config.row_limit);
    let mut loader = CachedLoader::new(
        DuckDbTripSource::new(&paths.db),
        ZoneLookupFile::new(&paths.zones),
        limit,
    );
    let table = loader.table().context("loading trips")?;

    let mut state = SessionState::initial(&table);
    args.apply(&mut state);
    let criteria = state.criteria()?;

    let filtered = table.filter(&criteria);
    let report = DashboardReport::from_filtered(table.len(), &criteria, &filtered);
    info!(
        loaded = report.loaded_trips,
        matched = report.metrics.trip_count,
        "Report built"
    );

    match args.format {
        ReportFormat::Markdown => write!(out, "{}", report.to_markdown())?,
        ReportFormat::Json => writeln!(out, "{}", report.to_json()?)?,
    }

    if let Some(path) = &args.export {
        export_trips(filtered.rows(), path)?;
    }
    if let Some(path) = &args.summary {
        export_summary(filtered.rows(), path)?;
    }
    if let Some(path) = &args.charts {
        export_charts(&dashboard_charts(filtered.rows(), &report.aggregates), path)?;
    }

    Ok(())
}
