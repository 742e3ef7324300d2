//! Exploratory queries run directly against the trip store.

use crate::error::{AnalyticsError, Result};
use crate::store::{StoredTrip, TripStore};
use duckdb::params;
use serde::{Deserialize, Serialize};

/// Which end of the trip a location count refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationSide {
    Pickup,
    Dropoff,
}

impl LocationSide {
    const fn column(self) -> &'static str {
        match self {
            Self::Pickup => "PULocationID",
            Self::Dropoff => "DOLocationID",
        }
    }
}

/// Trip count for one location, with its zone name when the zone table has it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCount {
    pub location_id: i32,
    pub zone: Option<String>,
    pub trip_count: i64,
}

/// Volume, fare and tip for one pickup hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyProfile {
    pub hour: i64,
    pub trip_count: i64,
    pub avg_fare: f64,
    pub avg_tip: f64,
}

impl TripStore {
    /// Total number of stored trips.
    pub fn trip_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM trips", [], |row| row.get(0))?;
        Ok(count)
    }

    /// First `n` trips by insertion order.
    pub fn sample_trips(&self, n: usize) -> Result<Vec<StoredTrip>> {
        self.fetch_trips(n)
    }

    /// Busiest pickup or dropoff locations, joined with zone names.
    pub fn top_locations(&self, side: LocationSide, limit: usize) -> Result<Vec<LocationCount>> {
        let query = format!(
            r#"
            SELECT
                t.{col} AS location_id,
                z.Zone AS zone,
                COUNT(*) AS trip_count
            FROM trips t
            LEFT JOIN zones z ON z.LocationID = t.{col}
            WHERE t.{col} IS NOT NULL
            GROUP BY t.{col}, z.Zone
            ORDER BY trip_count DESC, location_id
            LIMIT ?
            "#,
            col = side.column()
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(LocationCount {
                location_id: row.get(0)?,
                zone: row.get(1)?,
                trip_count: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }

    /// Trip volume with average fare and tip per pickup hour.
    ///
    /// Rows whose pickup text does not cast to a timestamp are skipped.
    pub fn hourly_profile(&self) -> Result<Vec<HourlyProfile>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                EXTRACT(HOUR FROM TRY_CAST(pickup_datetime AS TIMESTAMP)) AS hour,
                COUNT(*) AS trip_count,
                AVG(fare_amount) AS avg_fare,
                AVG(tip_amount) AS avg_tip
            FROM trips
            WHERE TRY_CAST(pickup_datetime AS TIMESTAMP) IS NOT NULL
            GROUP BY hour
            ORDER BY hour
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(HourlyProfile {
                hour: row.get(0)?,
                trip_count: row.get(1)?,
                avg_fare: row.get(2)?,
                avg_tip: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }
}
