//! # NYC Taxi Dashboard - Domain Model
//!
//! Trip records, zone reference data, derived per-trip metrics and the
//! filter predicate shared by the analytics layer and the dashboard CLI.
//!
//! Everything in this crate is pure: no I/O, no logging, no shared state.
//! Derivation and filtering are deterministic functions of a single row.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Timestamp formats accepted from the trip store and CSV sources.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

/// Canonical textual form used when timestamps are written back out.
/// Fractional seconds are printed only when present.
pub const TIMESTAMP_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse a trip timestamp.
///
/// Accepts ISO-like `YYYY-MM-DD HH:MM:SS` (with `T` or space, optional
/// fractional seconds), the TLC `MM/DD/YYYY hh:mm:ss AM` form, and a bare
/// date which resolves to midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, DomainError> {
    let value = raw.trim();

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| DomainError::MalformedTimestamp {
            value: raw.to_string(),
        })
}

// =============================================================================
// ENUMS
// =============================================================================

/// Weekday / weekend split of the pickup date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    /// Classify a 0-based weekday index (Monday = 0). Saturday and Sunday
    /// (5 and 6) are weekend days.
    #[must_use]
    pub const fn from_weekday_index(index: u32) -> Self {
        if index >= 5 {
            Self::Weekend
        } else {
            Self::Weekday
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weekday => "Weekday",
            Self::Weekend => "Weekend",
        }
    }
}

impl std::fmt::Display for DayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// REFERENCE DATA
// =============================================================================

/// One row of the TLC taxi zone lookup file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEntry {
    #[serde(rename = "LocationID")]
    pub location_id: i32,
    #[serde(rename = "Borough")]
    pub borough: String,
    #[serde(rename = "Zone")]
    pub zone: String,
    #[serde(default)]
    pub service_zone: String,
}

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// Trip record - one taxi ride as read from the trip store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub pickup_datetime: NaiveDateTime,
    pub dropoff_datetime: NaiveDateTime,
    /// Missing in some TLC months; `None` is kept distinct from zero
    pub passenger_count: Option<u32>,
    /// Miles
    pub trip_distance: f64,
    pub fare_amount: f64,
    pub tip_amount: f64,
    pub total_amount: f64,
    pub pickup_location_id: i32,
    pub dropoff_location_id: i32,
}

/// Enriched trip - a trip joined with its pickup zone plus derived metrics.
///
/// The field order is the column order of CSV exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTrip {
    #[serde(with = "timestamp_text")]
    pub pickup_datetime: NaiveDateTime,
    #[serde(with = "timestamp_text")]
    pub dropoff_datetime: NaiveDateTime,
    pub passenger_count: Option<u32>,
    pub trip_distance: f64,
    pub fare_amount: f64,
    pub tip_amount: f64,
    pub total_amount: f64,
    #[serde(rename = "PULocationID")]
    pub pickup_location_id: i32,
    #[serde(rename = "DOLocationID")]
    pub dropoff_location_id: i32,
    pub pickup_zone: String,

    // Derived
    pub hour: u32,
    pub duration_minutes: f64,
    pub weekday: u32,
    pub day_type: DayType,
    pub fare_per_mile: Option<f64>,
    pub speed_mph: Option<f64>,
    pub no_tip: bool,
    pub trip_date: NaiveDate,
}

impl EnrichedTrip {
    /// Compute the derived columns for one trip.
    ///
    /// Only the row's own columns are read. Zero denominators produce `None`
    /// for the ratio fields rather than an infinity.
    #[must_use]
    pub fn derive(trip: TripRecord, pickup_zone: String) -> Self {
        let pickup = trip.pickup_datetime;
        let duration_minutes =
            (trip.dropoff_datetime - pickup).num_milliseconds() as f64 / 60_000.0;
        let weekday = pickup.weekday().num_days_from_monday();

        Self {
            pickup_datetime: pickup,
            dropoff_datetime: trip.dropoff_datetime,
            passenger_count: trip.passenger_count,
            trip_distance: trip.trip_distance,
            fare_amount: trip.fare_amount,
            tip_amount: trip.tip_amount,
            total_amount: trip.total_amount,
            pickup_location_id: trip.pickup_location_id,
            dropoff_location_id: trip.dropoff_location_id,
            pickup_zone,
            hour: pickup.hour(),
            duration_minutes,
            weekday,
            day_type: DayType::from_weekday_index(weekday),
            fare_per_mile: guarded_ratio(trip.fare_amount, trip.trip_distance),
            speed_mph: guarded_ratio(trip.trip_distance, duration_minutes / 60.0),
            no_tip: trip.tip_amount == 0.0,
            trip_date: pickup.date(),
        }
    }

    /// Tip as a percentage of the fare, `None` when the fare is zero
    #[must_use]
    pub fn tip_pct(&self) -> Option<f64> {
        guarded_ratio(self.tip_amount, self.fare_amount).map(|r| r * 100.0)
    }
}

/// `numerator / denominator`, or `None` for a zero denominator or any
/// non-finite result.
#[must_use]
pub fn guarded_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

// =============================================================================
// QUERY/FILTER TYPES
// =============================================================================

/// Conjunction of the four user-selected predicates.
///
/// Date and hour ranges are inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hour_start: u32,
    pub hour_end: u32,
    pub min_passengers: u32,
    pub allowed_zones: BTreeSet<String>,
}

impl FilterCriteria {
    /// Reject hour bounds outside 0-23 and inverted ranges.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.hour_start > 23 || self.hour_end > 23 {
            return Err(DomainError::InvalidFilter(format!(
                "hour range {}-{} must lie within 0-23",
                self.hour_start, self.hour_end
            )));
        }
        if self.hour_start > self.hour_end {
            return Err(DomainError::InvalidFilter(format!(
                "hour range start {} is after end {}",
                self.hour_start, self.hour_end
            )));
        }
        if self.start_date > self.end_date {
            return Err(DomainError::InvalidFilter(format!(
                "date range start {} is after end {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }

    /// True iff the trip satisfies all four predicates.
    ///
    /// A trip with an unknown passenger count only passes when
    /// `min_passengers` is zero.
    #[must_use]
    pub fn matches(&self, trip: &EnrichedTrip) -> bool {
        let passengers_ok = match trip.passenger_count {
            Some(count) => count >= self.min_passengers,
            None => self.min_passengers == 0,
        };

        trip.trip_date >= self.start_date
            && trip.trip_date <= self.end_date
            && trip.hour >= self.hour_start
            && trip.hour <= self.hour_end
            && passengers_ok
            && self.allowed_zones.contains(&trip.pickup_zone)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Unparsable timestamp: {value:?}")]
    MalformedTimestamp { value: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

/// Serde adapter writing timestamps as `YYYY-MM-DD HH:MM:SS`.
mod timestamp_text {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(super::TIMESTAMP_OUTPUT_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
