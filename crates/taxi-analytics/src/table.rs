//! The enriched trip table and the filter stage.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use taxi_domain::{EnrichedTrip, FilterCriteria};
use tracing::debug;

/// Immutable set of enriched trips.
///
/// Filtering never mutates a table; it produces a new one holding the
/// matching rows in their original order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripTable {
    rows: Vec<EnrichedTrip>,
}

impl TripTable {
    pub fn new(rows: Vec<EnrichedTrip>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EnrichedTrip] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows satisfying every predicate of `criteria`, order preserved.
    #[must_use]
    pub fn filter(&self, criteria: &FilterCriteria) -> TripTable {
        let rows: Vec<EnrichedTrip> = self
            .rows
            .iter()
            .filter(|trip| criteria.matches(trip))
            .cloned()
            .collect();
        debug!(input = self.rows.len(), output = rows.len(), "Trips filtered");
        TripTable { rows }
    }

    /// Distinct pickup zone labels, sorted.
    pub fn zones(&self) -> BTreeSet<String> {
        self.rows.iter().map(|t| t.pickup_zone.clone()).collect()
    }

    /// Earliest and latest pickup dates, `None` for an empty table.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|t| t.trip_date).min()?;
        let max = self.rows.iter().map(|t| t.trip_date).max()?;
        Some((min, max))
    }

    /// Largest known passenger count, zero when none is known.
    pub fn max_passengers(&self) -> u32 {
        self.rows
            .iter()
            .filter_map(|t| t.passenger_count)
            .max()
            .unwrap_or(0)
    }

    /// Criteria that every row of this table satisfies.
    pub fn unrestricted_criteria(&self) -> FilterCriteria {
        let (start_date, end_date) = self
            .date_bounds()
            .unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
        FilterCriteria {
            start_date,
            end_date,
            hour_start: 0,
            hour_end: 23,
            min_passengers: 0,
            allowed_zones: self.zones(),
        }
    }
}

impl From<Vec<EnrichedTrip>> for TripTable {
    fn from(rows: Vec<EnrichedTrip>) -> Self {
        Self::new(rows)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use taxi_domain::{parse_timestamp, TripRecord};

    pub(crate) fn enriched(
        pickup: &str,
        minutes: i64,
        passengers: Option<u32>,
        distance: f64,
        fare: f64,
        tip: f64,
        zone: &str,
    ) -> EnrichedTrip {
        let pickup = parse_timestamp(pickup).unwrap();
        EnrichedTrip::derive(
            TripRecord {
                pickup_datetime: pickup,
                dropoff_datetime: pickup + chrono::Duration::minutes(minutes),
                passenger_count: passengers,
                trip_distance: distance,
                fare_amount: fare,
                tip_amount: tip,
                total_amount: fare + tip + 1.0,
                pickup_location_id: 161,
                dropoff_location_id: 236,
            },
            zone.to_string(),
        )
    }

    pub(crate) fn sample_table() -> TripTable {
        TripTable::new(vec![
            enriched("2023-03-01 07:10:00", 20, Some(1), 3.0, 15.0, 3.0, "Midtown Center"),
            enriched("2023-03-01 08:30:00", 12, Some(0), 1.2, 8.0, 0.0, "Upper East Side South"),
            enriched("2023-03-02 17:45:00", 35, Some(2), 9.0, 34.0, 7.0, "JFK Airport"),
            enriched("2023-03-04 23:05:00", 0, Some(3), 0.0, 10.0, 0.0, "Midtown Center"),
            enriched("2023-03-05 02:40:00", 18, None, 4.5, 19.0, 4.0, "East Village"),
            enriched("2023-03-06 12:00:00", 25, Some(1), 5.0, 22.0, 0.0, "JFK Airport"),
        ])
    }

    fn brute_force_count(table: &TripTable, c: &FilterCriteria) -> usize {
        let mut count = 0;
        for t in table.rows() {
            let date_ok = t.trip_date >= c.start_date && t.trip_date <= c.end_date;
            let hour_ok = t.hour >= c.hour_start && t.hour <= c.hour_end;
            let pax_ok = t.passenger_count.map_or(c.min_passengers == 0, |p| p >= c.min_passengers);
            let zone_ok = c.allowed_zones.contains(&t.pickup_zone);
            if date_ok && hour_ok && pax_ok && zone_ok {
                count += 1;
            }
        }
        count
    }

    #[test]
    fn test_unrestricted_filter_is_identity() {
        let table = sample_table();
        let criteria = table.unrestricted_criteria();
        assert_eq!(table.filter(&criteria), table);
    }

    #[test]
    fn test_empty_zone_set_yields_empty_table() {
        let table = sample_table();
        let mut criteria = table.unrestricted_criteria();
        criteria.allowed_zones.clear();
        assert!(table.filter(&criteria).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let table = sample_table();
        let mut criteria = table.unrestricted_criteria();
        criteria.hour_start = 7;
        criteria.hour_end = 18;
        criteria.min_passengers = 1;

        let once = table.filter(&criteria);
        let twice = once.filter(&criteria);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn test_filter_preserves_order() {
        let table = sample_table();
        let mut criteria = table.unrestricted_criteria();
        criteria.allowed_zones = ["JFK Airport", "Midtown Center"]
            .into_iter()
            .map(String::from)
            .collect();

        let hours: Vec<u32> = table.filter(&criteria).rows().iter().map(|t| t.hour).collect();
        assert_eq!(hours, vec![7, 17, 23, 12]);
    }

    #[test]
    fn test_filter_count_matches_brute_force() {
        let table = sample_table();
        let (first, last) = table.date_bounds().unwrap();
        let zone_sets: Vec<BTreeSet<String>> = vec![
            table.zones(),
            ["JFK Airport".to_string()].into_iter().collect(),
            BTreeSet::new(),
        ];

        for zones in &zone_sets {
            for (h0, h1) in [(0, 23), (7, 8), (12, 23), (2, 2)] {
                for min_passengers in 0..4 {
                    for start in [first, first.succ_opt().unwrap()] {
                        let criteria = FilterCriteria {
                            start_date: start,
                            end_date: last,
                            hour_start: h0,
                            hour_end: h1,
                            min_passengers,
                            allowed_zones: zones.clone(),
                        };
                        assert_eq!(
                            table.filter(&criteria).len(),
                            brute_force_count(&table, &criteria)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_zero_minimum_admits_zero_passenger_trips() {
        let table = sample_table();
        let mut criteria = table.unrestricted_criteria();
        criteria.min_passengers = 0;
        assert!(table
            .filter(&criteria)
            .rows()
            .iter()
            .any(|t| t.passenger_count == Some(0)));

        criteria.min_passengers = 1;
        assert!(!table
            .filter(&criteria)
            .rows()
            .iter()
            .any(|t| t.passenger_count == Some(0)));
    }

    #[test]
    fn test_table_bounds() {
        let table = sample_table();
        assert_eq!(
            table.date_bounds(),
            Some((
                NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 3, 6).unwrap()
            ))
        );
        assert_eq!(table.max_passengers(), 3);
        assert_eq!(table.zones().len(), 4);
        assert_eq!(TripTable::default().date_bounds(), None);
        assert_eq!(TripTable::default().max_passengers(), 0);
    }
}
