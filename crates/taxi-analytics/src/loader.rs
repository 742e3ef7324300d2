//! Loader: reads raw trips and the zone lookup, joins them and derives the
//! enriched table.

use crate::error::{AnalyticsError, Result};
use crate::store::{StoredTrip, TripStore};
use crate::table::TripTable;
use crate::zones::{ZoneLookupFile, ZoneNames};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taxi_domain::{parse_timestamp, EnrichedTrip, TripRecord, ZoneEntry};
use tracing::{info, warn};

/// Default row limit for a dashboard load.
pub const DEFAULT_ROW_LIMIT: usize = 10_000;

/// Row-limited read access to raw trips.
pub trait TripSource {
    /// Up to `limit` raw trips in a stable order
    fn fetch_trips(&self, limit: usize) -> Result<Vec<StoredTrip>>;
}

/// Read access to zone reference data.
pub trait ZoneSource {
    fn read_zones(&self) -> Result<Vec<ZoneEntry>>;
}

impl TripSource for TripStore {
    fn fetch_trips(&self, limit: usize) -> Result<Vec<StoredTrip>> {
        TripStore::fetch_trips(self, limit)
    }
}

impl ZoneSource for ZoneLookupFile {
    fn read_zones(&self) -> Result<Vec<ZoneEntry>> {
        self.read_entries()
    }
}

/// Trip source that opens a read-only connection per fetch and closes it
/// when done.
#[derive(Debug, Clone)]
pub struct DuckDbTripSource {
    path: PathBuf,
}

impl DuckDbTripSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TripSource for DuckDbTripSource {
    fn fetch_trips(&self, limit: usize) -> Result<Vec<StoredTrip>> {
        let store = TripStore::open_read_only(&self.path)?;
        TripStore::fetch_trips(&store, limit)
    }
}

/// Load and enrich up to `limit` trips.
///
/// Fails with [`AnalyticsError::DataUnavailable`] when the trip source
/// cannot be read and with [`AnalyticsError::MalformedInput`] when any
/// timestamp in the batch is unparsable. An unreadable zone lookup is not
/// fatal: pickup zones are then labelled with their location id.
#[tracing::instrument(skip(trips, zones))]
pub fn load_enriched<T, Z>(trips: &T, zones: &Z, limit: usize) -> Result<TripTable>
where
    T: TripSource + ?Sized,
    Z: ZoneSource + ?Sized,
{
    let raw = trips.fetch_trips(limit).map_err(|e| match e {
        AnalyticsError::DataUnavailable(_) => e,
        other => AnalyticsError::DataUnavailable(other.to_string()),
    })?;

    let names = match zones.read_zones() {
        Ok(entries) => {
            let names = ZoneNames::from_entries(&entries);
            if names.is_empty() {
                warn!("Zone lookup is empty, labelling pickup zones by location id");
            }
            names
        }
        Err(e) => {
            warn!(error = %e, "Zone lookup unavailable, labelling pickup zones by location id");
            ZoneNames::default()
        }
    };

    let rows = derive_batch(raw, &names)?;
    info!(rows = rows.len(), zones = names.len(), "Enriched trip table loaded");
    Ok(TripTable::new(rows))
}

/// Parse and derive every row. One bad timestamp fails the whole batch.
pub fn derive_batch(raw: Vec<StoredTrip>, names: &ZoneNames) -> Result<Vec<EnrichedTrip>> {
    raw.into_iter()
        .enumerate()
        .map(|(row, stored)| {
            let record = to_record(row, stored)?;
            let zone = names.label(record.pickup_location_id);
            Ok(EnrichedTrip::derive(record, zone))
        })
        .collect()
}

fn to_record(row: usize, stored: StoredTrip) -> Result<TripRecord> {
    let malformed = |e: taxi_domain::DomainError| AnalyticsError::MalformedInput {
        row,
        reason: e.to_string(),
    };

    Ok(TripRecord {
        pickup_datetime: parse_timestamp(&stored.pickup_datetime).map_err(malformed)?,
        dropoff_datetime: parse_timestamp(&stored.dropoff_datetime).map_err(malformed)?,
        // Negative counts are treated as unknown
        passenger_count: stored.passenger_count.and_then(|p| u32::try_from(p).ok()),
        trip_distance: stored.trip_distance,
        fare_amount: stored.fare_amount,
        tip_amount: stored.tip_amount,
        total_amount: stored.total_amount,
        pickup_location_id: stored.pickup_location_id,
        dropoff_location_id: stored.dropoff_location_id,
    })
}

/// Memoizes the enriched table for the lifetime of a session.
///
/// The first call to [`CachedLoader::table`] loads; later calls return the
/// same immutable table until [`CachedLoader::reload`] is called.
pub struct CachedLoader<T, Z> {
    trips: T,
    zones: Z,
    limit: usize,
    table: Option<Arc<TripTable>>,
}

impl<T: TripSource, Z: ZoneSource> CachedLoader<T, Z> {
    pub fn new(trips: T, zones: Z, limit: usize) -> Self {
        Self {
            trips,
            zones,
            limit,
            table: None,
        }
    }

    /// The cached table, loading it on first use.
    pub fn table(&mut self) -> Result<Arc<TripTable>> {
        match &self.table {
            Some(table) => Ok(Arc::clone(table)),
            None => self.reload(),
        }
    }

    /// Discard any cached table and load again.
    pub fn reload(&mut self) -> Result<Arc<TripTable>> {
        self.table = None;
        let table = Arc::new(load_enriched(&self.trips, &self.zones, self.limit)?);
        self.table = Some(Arc::clone(&table));
        Ok(table)
    }

    pub fn is_loaded(&self) -> bool {
        self.table.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::stored;
    use std::cell::Cell;

    struct FixedTrips {
        rows: Vec<StoredTrip>,
        calls: Cell<usize>,
    }

    impl TripSource for FixedTrips {
        fn fetch_trips(&self, limit: usize) -> Result<Vec<StoredTrip>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.rows.iter().take(limit).cloned().collect())
        }
    }

    struct FixedZones(Vec<ZoneEntry>);

    impl ZoneSource for FixedZones {
        fn read_zones(&self) -> Result<Vec<ZoneEntry>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenZones;

    impl ZoneSource for BrokenZones {
        fn read_zones(&self) -> Result<Vec<ZoneEntry>> {
            Err(AnalyticsError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "taxi_zone_lookup.csv",
            )))
        }
    }

    struct DownStore;

    impl TripSource for DownStore {
        fn fetch_trips(&self, _limit: usize) -> Result<Vec<StoredTrip>> {
            Err(AnalyticsError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "nyc_mobility.db",
            )))
        }
    }

    fn trips() -> FixedTrips {
        FixedTrips {
            rows: vec![
                stored("2023-03-01 08:00:00", "2023-03-01 08:20:00", 3.0, 15.0, 3.0, 161),
                stored("2023-03-04 13:00:00", "2023-03-04 13:10:00", 0.0, 10.0, 0.0, 264),
                stored("2023-03-05 22:00:00", "2023-03-05 22:30:00", 8.0, 30.0, 6.0, 132),
            ],
            calls: Cell::new(0),
        }
    }

    fn zones() -> FixedZones {
        FixedZones(vec![
            ZoneEntry {
                location_id: 161,
                borough: "Manhattan".into(),
                zone: "Midtown Center".into(),
                service_zone: "Yellow Zone".into(),
            },
            ZoneEntry {
                location_id: 132,
                borough: "Queens".into(),
                zone: "JFK Airport".into(),
                service_zone: "Airports".into(),
            },
        ])
    }

    #[test]
    fn test_load_joins_zone_names() {
        let table = load_enriched(&trips(), &zones(), 10).unwrap();
        let labels: Vec<&str> = table.rows().iter().map(|t| t.pickup_zone.as_str()).collect();
        assert_eq!(labels, vec!["Midtown Center", "264", "JFK Airport"]);
        assert_eq!(table.rows()[1].fare_per_mile, None);
    }

    #[test]
    fn test_load_respects_row_limit() {
        let table = load_enriched(&trips(), &zones(), 2).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_broken_lookup_falls_back_to_ids() {
        let table = load_enriched(&trips(), &BrokenZones, 10).unwrap();
        let labels: Vec<&str> = table.rows().iter().map(|t| t.pickup_zone.as_str()).collect();
        assert_eq!(labels, vec!["161", "264", "132"]);
    }

    #[test]
    fn test_empty_lookup_falls_back_to_ids() {
        let table = load_enriched(&trips(), &FixedZones(vec![]), 10).unwrap();
        let labels: Vec<&str> = table.rows().iter().map(|t| t.pickup_zone.as_str()).collect();
        assert_eq!(labels, vec!["161", "264", "132"]);
    }

    #[test]
    fn test_unreachable_store_is_data_unavailable() {
        let err = load_enriched(&DownStore, &zones(), 10).unwrap_err();
        assert!(matches!(err, AnalyticsError::DataUnavailable(_)));
    }

    #[test]
    fn test_missing_database_file_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = DuckDbTripSource::new(dir.path().join("nyc_mobility.db"));
        let err = load_enriched(&source, &zones(), 10).unwrap_err();
        assert!(matches!(err, AnalyticsError::DataUnavailable(_)));
    }

    #[test]
    fn test_one_bad_timestamp_fails_whole_batch() {
        let mut source = trips();
        source.rows[2].dropoff_datetime = "2023-03-05 25:99".into();
        let err = load_enriched(&source, &zones(), 10).unwrap_err();
        match err {
            AnalyticsError::MalformedInput { row, .. } => assert_eq!(row, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_passenger_count_is_unknown() {
        let mut source = trips();
        source.rows[0].passenger_count = Some(-1);
        let table = load_enriched(&source, &zones(), 10).unwrap();
        assert_eq!(table.rows()[0].passenger_count, None);
    }

    #[test]
    fn test_duckdb_source_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nyc_mobility.db");
        {
            let store = TripStore::open(&path).unwrap();
            store.insert_trips(&trips().rows).unwrap();
        }
        let table = load_enriched(&DuckDbTripSource::new(&path), &zones(), 10).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[2].pickup_zone, "JFK Airport");
    }

    #[test]
    fn test_cached_loader_loads_once() {
        let mut loader = CachedLoader::new(trips(), zones(), 10);
        assert!(!loader.is_loaded());

        let first = loader.table().unwrap();
        let second = loader.table().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.trips.calls.get(), 1);

        let third = loader.reload().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(loader.trips.calls.get(), 2);
        assert_eq!(*first, *third);
    }
}
