//! Trip store backed by DuckDB.
//!
//! Holds the raw `trips` table and the `zones` reference table. Timestamps
//! are kept as text exactly as ingested; parsing happens in the loader.

use crate::error::{AnalyticsError, Result};
use duckdb::{params, AccessMode, Config, Connection};
use serde::Deserialize;
use std::path::Path;
use taxi_domain::ZoneEntry;
use tracing::{debug, info};

/// Default number of rows taken from a TLC monthly file.
pub const DEFAULT_INGEST_LIMIT: usize = 50_000;

/// DuckDB-based store for raw trip rows and zone reference data.
pub struct TripStore {
    pub(crate) conn: Connection,
}

impl TripStore {
    /// Create a new in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open (or create) a persistent store, creating the parent directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an existing store read-only. The schema is not touched.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Err(AnalyticsError::DataUnavailable(format!(
                "trip store {} does not exist",
                path.as_ref().display()
            )));
        }
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        let conn = Connection::open_with_flags(path, config)?;
        Ok(Self { conn })
    }

    /// Initialize the store schema.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE SEQUENCE IF NOT EXISTS trip_id_seq START 1;

            -- Zone reference data
            CREATE TABLE IF NOT EXISTS zones (
                LocationID INTEGER PRIMARY KEY,
                Borough VARCHAR,
                Zone VARCHAR,
                service_zone VARCHAR
            );

            -- Raw trips; location ids are not constrained so trips can be
            -- loaded before the zone file
            CREATE TABLE IF NOT EXISTS trips (
                trip_id BIGINT PRIMARY KEY DEFAULT nextval('trip_id_seq'),
                pickup_datetime VARCHAR NOT NULL,
                dropoff_datetime VARCHAR NOT NULL,
                passenger_count INTEGER,
                trip_distance DOUBLE NOT NULL,
                fare_amount DOUBLE NOT NULL,
                tip_amount DOUBLE NOT NULL,
                total_amount DOUBLE NOT NULL,
                PULocationID INTEGER NOT NULL,
                DOLocationID INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_trips_pickup_location ON trips(PULocationID);
            CREATE INDEX IF NOT EXISTS idx_trips_dropoff_location ON trips(DOLocationID);
            "#,
        )?;
        Ok(())
    }

    /// Append raw trips in a single transaction.
    pub fn insert_trips(&self, trips: &[StoredTrip]) -> Result<usize> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        match self.insert_rows(trips) {
            Ok(count) => {
                self.conn.execute_batch("COMMIT")?;
                debug!(count, "Trips committed");
                Ok(count)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    fn insert_rows(&self, trips: &[StoredTrip]) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            r#"
            INSERT INTO trips (
                pickup_datetime, dropoff_datetime, passenger_count, trip_distance,
                fare_amount, tip_amount, total_amount, PULocationID, DOLocationID
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )?;

        let mut count = 0;
        for trip in trips {
            stmt.execute(params![
                trip.pickup_datetime,
                trip.dropoff_datetime,
                trip.passenger_count,
                trip.trip_distance,
                trip.fare_amount,
                trip.tip_amount,
                trip.total_amount,
                trip.pickup_location_id,
                trip.dropoff_location_id,
            ])?;
            count += 1;
        }
        Ok(count)
    }

    /// Ingest the first `limit` rows of a TLC yellow-taxi CSV file.
    ///
    /// Only the nine trip columns are read; everything else in the file is
    /// ignored.
    pub fn ingest_yellow_csv<P: AsRef<Path>>(&self, path: P, limit: usize) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut trips = Vec::with_capacity(limit.min(DEFAULT_INGEST_LIMIT));

        for (index, result) in reader.deserialize::<YellowCsvRow>().enumerate() {
            if index >= limit {
                break;
            }
            trips.push(StoredTrip::from(result?));
        }

        let count = self.insert_trips(&trips)?;
        info!(path = %path.as_ref().display(), count, "Yellow taxi CSV ingested");
        Ok(count)
    }

    /// Import the first `limit` rows of a TLC yellow-taxi Parquet file.
    pub fn import_yellow_parquet<P: AsRef<Path>>(&self, path: P, limit: usize) -> Result<usize> {
        let query = format!(
            r#"
            INSERT INTO trips (
                pickup_datetime, dropoff_datetime, passenger_count, trip_distance,
                fare_amount, tip_amount, total_amount, PULocationID, DOLocationID
            )
            SELECT
                strftime(tpep_pickup_datetime, '%Y-%m-%d %H:%M:%S'),
                strftime(tpep_dropoff_datetime, '%Y-%m-%d %H:%M:%S'),
                CAST(passenger_count AS INTEGER),
                trip_distance,
                fare_amount,
                tip_amount,
                total_amount,
                PULocationID,
                DOLocationID
            FROM read_parquet('{}')
            LIMIT {}
            "#,
            sql_path(path.as_ref()),
            limit
        );
        let count = self.conn.execute(&query, [])?;
        info!(path = %path.as_ref().display(), count, "Yellow taxi Parquet imported");
        Ok(count)
    }

    /// Convert a Parquet file into a CSV file with a header row.
    pub fn parquet_to_csv<P: AsRef<Path>, Q: AsRef<Path>>(&self, parquet: P, csv: Q) -> Result<()> {
        let query = format!(
            "COPY (SELECT * FROM read_parquet('{}')) TO '{}' (HEADER, DELIMITER ',')",
            sql_path(parquet.as_ref()),
            sql_path(csv.as_ref())
        );
        self.conn.execute(&query, [])?;
        info!(
            parquet = %parquet.as_ref().display(),
            csv = %csv.as_ref().display(),
            "Parquet converted to CSV"
        );
        Ok(())
    }

    /// Insert or replace zone reference rows.
    pub fn ingest_zones(&self, zones: &[ZoneEntry]) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare("INSERT OR REPLACE INTO zones (LocationID, Borough, Zone, service_zone) VALUES (?, ?, ?, ?)")?;

        let mut count = 0;
        for zone in zones {
            stmt.execute(params![
                zone.location_id,
                zone.borough,
                zone.zone,
                zone.service_zone,
            ])?;
            count += 1;
        }
        info!(count, "Zones ingested");
        Ok(count)
    }

    /// Read up to `limit` raw trips in insertion order.
    pub fn fetch_trips(&self, limit: usize) -> Result<Vec<StoredTrip>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                pickup_datetime, dropoff_datetime, passenger_count, trip_distance,
                fare_amount, tip_amount, total_amount, PULocationID, DOLocationID
            FROM trips
            ORDER BY trip_id
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(StoredTrip {
                pickup_datetime: row.get(0)?,
                dropoff_datetime: row.get(1)?,
                passenger_count: row.get(2)?,
                trip_distance: row.get(3)?,
                fare_amount: row.get(4)?,
                tip_amount: row.get(5)?,
                total_amount: row.get(6)?,
                pickup_location_id: row.get(7)?,
                dropoff_location_id: row.get(8)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }
}

/// Escape a filesystem path for use inside a single-quoted SQL literal.
fn sql_path(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}

/// A trip row as stored: timestamps are still text.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTrip {
    pub pickup_datetime: String,
    pub dropoff_datetime: String,
    pub passenger_count: Option<i32>,
    pub trip_distance: f64,
    pub fare_amount: f64,
    pub tip_amount: f64,
    pub total_amount: f64,
    pub pickup_location_id: i32,
    pub dropoff_location_id: i32,
}

/// Columns of interest in a TLC yellow-taxi CSV.
#[derive(Debug, Deserialize)]
struct YellowCsvRow {
    tpep_pickup_datetime: String,
    tpep_dropoff_datetime: String,
    // Published as a float ("1.0") and sometimes blank
    passenger_count: Option<f64>,
    trip_distance: f64,
    fare_amount: f64,
    tip_amount: f64,
    total_amount: f64,
    #[serde(rename = "PULocationID")]
    pickup_location_id: i32,
    #[serde(rename = "DOLocationID")]
    dropoff_location_id: i32,
}

impl From<YellowCsvRow> for StoredTrip {
    fn from(row: YellowCsvRow) -> Self {
        Self {
            pickup_datetime: row.tpep_pickup_datetime.trim().to_string(),
            dropoff_datetime: row.tpep_dropoff_datetime.trim().to_string(),
            passenger_count: row.passenger_count.map(|p| p as i32),
            trip_distance: row.trip_distance,
            fare_amount: row.fare_amount,
            tip_amount: row.tip_amount,
            total_amount: row.total_amount,
            pickup_location_id: row.pickup_location_id,
            dropoff_location_id: row.dropoff_location_id,
        }
    }
}
