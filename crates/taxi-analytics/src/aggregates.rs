//! Grouped aggregates behind the dashboard charts.

use crate::metrics::quantile_linear;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use taxi_domain::{DayType, EnrichedTrip};

/// Number of bins for the fare-per-mile histogram.
pub const FARE_PER_MILE_BINS: usize = 40;

/// Number of bins for the speed histogram.
pub const SPEED_BINS: usize = 50;

/// Default length of "top N" rankings.
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub trip_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourDayTypeCount {
    pub hour: u32,
    pub day_type: DayType,
    pub trip_count: usize,
}

/// Revenue, volume and averages for one pickup hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourSummary {
    pub hour: u32,
    pub trip_count: usize,
    pub revenue: f64,
    pub avg_fare: f64,
    pub avg_tip: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassengerBucket {
    pub passenger_count: u32,
    pub trip_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneCount {
    pub zone: String,
    pub trip_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropoffCount {
    pub location_id: i32,
    pub trip_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub hour: u32,
    pub zone: String,
    pub trip_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRevenue {
    pub zone: String,
    pub avg_revenue: f64,
    pub trip_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTypeSummary {
    pub day_type: DayType,
    pub revenue: f64,
    pub trip_count: usize,
}

/// Five-number summary of fares for one passenger count.
///
/// Whiskers reach the most extreme fares within 1.5 IQR of the quartiles;
/// fares beyond them are listed as outliers in row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareBox {
    pub passenger_count: u32,
    pub trip_count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl FareBox {
    /// `None` for an empty set of fares.
    pub fn from_fares(passenger_count: u32, fares: &[f64]) -> Option<Self> {
        let q1 = quantile_linear(fares, 0.25)?;
        let median = quantile_linear(fares, 0.5)?;
        let q3 = quantile_linear(fares, 0.75)?;
        let min = quantile_linear(fares, 0.0)?;
        let max = quantile_linear(fares, 1.0)?;

        let fence = 1.5 * (q3 - q1);
        let (low_fence, high_fence) = (q1 - fence, q3 + fence);
        let inside = fares.iter().copied().filter(|f| (low_fence..=high_fence).contains(f));

        Some(Self {
            passenger_count,
            trip_count: fares.len(),
            min,
            q1,
            median,
            q3,
            max,
            lower_whisker: inside.clone().fold(f64::INFINITY, f64::min),
            upper_whisker: inside.fold(f64::NEG_INFINITY, f64::max),
            outliers: fares
                .iter()
                .copied()
                .filter(|f| !(low_fence..=high_fence).contains(f))
                .collect(),
        })
    }
}

/// Equal-width histogram. `edges` has one more entry than `counts`; the
/// last bin is closed on the right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width bins spanning their range.
    ///
    /// A constant series is spread over `value ± 0.5`. Empty input gives an
    /// empty histogram.
    pub fn build(values: &[f64], bins: usize) -> Self {
        if values.is_empty() || bins == 0 {
            return Self {
                edges: Vec::new(),
                counts: Vec::new(),
            };
        }

        let (mut lo, mut hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0; bins];
        for &v in values {
            let index = (((v - lo) / width) as usize).min(bins - 1);
            counts[index] += 1;
        }

        Self { edges, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Every grouped view of a filtered selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardAggregates {
    pub daily_counts: Vec<DailyCount>,
    pub hour_day_type_counts: Vec<HourDayTypeCount>,
    pub hourly: Vec<HourSummary>,
    pub passenger_distribution: Vec<PassengerBucket>,
    pub fare_by_passengers: Vec<FareBox>,
    pub top_pickup_zones: Vec<ZoneCount>,
    pub top_dropoff_locations: Vec<DropoffCount>,
    pub hour_zone_heatmap: Vec<HeatmapCell>,
    pub top_zone_revenue: Vec<ZoneRevenue>,
    pub day_type_summary: Vec<DayTypeSummary>,
    pub fare_per_mile_histogram: Histogram,
    pub speed_histogram: Histogram,
}

impl DashboardAggregates {
    /// Compute all grouped views. Rankings keep at most `top_n` entries.
    pub fn compute(trips: &[EnrichedTrip], top_n: usize) -> Self {
        let fare_per_mile: Vec<f64> = trips.iter().filter_map(|t| t.fare_per_mile).collect();
        let speeds: Vec<f64> = trips.iter().filter_map(|t| t.speed_mph).collect();

        Self {
            daily_counts: daily_counts(trips),
            hour_day_type_counts: hour_day_type_counts(trips),
            hourly: hourly_summary(trips),
            passenger_distribution: passenger_distribution(trips),
            fare_by_passengers: fare_by_passengers(trips),
            top_pickup_zones: top_pickup_zones(trips, top_n),
            top_dropoff_locations: top_dropoff_locations(trips, top_n),
            hour_zone_heatmap: hour_zone_heatmap(trips),
            top_zone_revenue: top_zone_revenue(trips, top_n),
            day_type_summary: day_type_summary(trips),
            fare_per_mile_histogram: Histogram::build(&fare_per_mile, FARE_PER_MILE_BINS),
            speed_histogram: Histogram::build(&speeds, SPEED_BINS),
        }
    }
}

/// Trips per pickup date, ascending by date.
pub fn daily_counts(trips: &[EnrichedTrip]) -> Vec<DailyCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for t in trips {
        *counts.entry(t.trip_date).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(date, trip_count)| DailyCount { date, trip_count })
        .collect()
}

/// Trips per (hour, day type), ascending by hour then day type.
pub fn hour_day_type_counts(trips: &[EnrichedTrip]) -> Vec<HourDayTypeCount> {
    let mut counts: BTreeMap<(u32, DayType), usize> = BTreeMap::new();
    for t in trips {
        *counts.entry((t.hour, t.day_type)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((hour, day_type), trip_count)| HourDayTypeCount {
            hour,
            day_type,
            trip_count,
        })
        .collect()
}

/// Per-hour volume, revenue, mean fare and mean tip for hours with trips.
pub fn hourly_summary(trips: &[EnrichedTrip]) -> Vec<HourSummary> {
    // (count, revenue, fare sum, tip sum)
    let mut sums: BTreeMap<u32, (usize, f64, f64, f64)> = BTreeMap::new();
    for t in trips {
        let entry = sums.entry(t.hour).or_default();
        entry.0 += 1;
        entry.1 += t.total_amount;
        entry.2 += t.fare_amount;
        entry.3 += t.tip_amount;
    }
    sums.into_iter()
        .map(|(hour, (count, revenue, fares, tips))| HourSummary {
            hour,
            trip_count: count,
            revenue,
            avg_fare: fares / count as f64,
            avg_tip: tips / count as f64,
        })
        .collect()
}

/// Trips per known passenger count, ascending.
pub fn passenger_distribution(trips: &[EnrichedTrip]) -> Vec<PassengerBucket> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for p in trips.iter().filter_map(|t| t.passenger_count) {
        *counts.entry(p).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(passenger_count, trip_count)| PassengerBucket {
            passenger_count,
            trip_count,
        })
        .collect()
}

/// Fare box summaries per known passenger count, ascending.
pub fn fare_by_passengers(trips: &[EnrichedTrip]) -> Vec<FareBox> {
    let mut fares: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for t in trips {
        if let Some(p) = t.passenger_count {
            fares.entry(p).or_default().push(t.fare_amount);
        }
    }
    fares
        .into_iter()
        .filter_map(|(p, values)| FareBox::from_fares(p, &values))
        .collect()
}

/// Busiest pickup zones, ties broken by zone name.
pub fn top_pickup_zones(trips: &[EnrichedTrip], n: usize) -> Vec<ZoneCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in trips {
        *counts.entry(t.pickup_zone.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<ZoneCount> = counts
        .into_iter()
        .map(|(zone, trip_count)| ZoneCount {
            zone: zone.to_string(),
            trip_count,
        })
        .collect();
    ranked.sort_by(|a, b| b.trip_count.cmp(&a.trip_count).then_with(|| a.zone.cmp(&b.zone)));
    ranked.truncate(n);
    ranked
}

/// Busiest dropoff location ids, ties broken by id.
pub fn top_dropoff_locations(trips: &[EnrichedTrip], n: usize) -> Vec<DropoffCount> {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for t in trips {
        *counts.entry(t.dropoff_location_id).or_default() += 1;
    }
    let mut ranked: Vec<DropoffCount> = counts
        .into_iter()
        .map(|(location_id, trip_count)| DropoffCount {
            location_id,
            trip_count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.trip_count
            .cmp(&a.trip_count)
            .then_with(|| a.location_id.cmp(&b.location_id))
    });
    ranked.truncate(n);
    ranked
}

/// Non-empty (hour, zone) cells.
pub fn hour_zone_heatmap(trips: &[EnrichedTrip]) -> Vec<HeatmapCell> {
    let mut counts: BTreeMap<(u32, &str), usize> = BTreeMap::new();
    for t in trips {
        *counts.entry((t.hour, t.pickup_zone.as_str())).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((hour, zone), trip_count)| HeatmapCell {
            hour,
            zone: zone.to_string(),
            trip_count,
        })
        .collect()
}

/// Zones with the highest mean total amount per trip.
pub fn top_zone_revenue(trips: &[EnrichedTrip], n: usize) -> Vec<ZoneRevenue> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for t in trips {
        let entry = sums.entry(t.pickup_zone.as_str()).or_default();
        entry.0 += t.total_amount;
        entry.1 += 1;
    }
    let mut ranked: Vec<ZoneRevenue> = sums
        .into_iter()
        .map(|(zone, (revenue, count))| ZoneRevenue {
            zone: zone.to_string(),
            avg_revenue: revenue / count as f64,
            trip_count: count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.avg_revenue
            .total_cmp(&a.avg_revenue)
            .then_with(|| a.zone.cmp(&b.zone))
    });
    ranked.truncate(n);
    ranked
}

/// Revenue and trip count for weekdays and weekends that have trips.
pub fn day_type_summary(trips: &[EnrichedTrip]) -> Vec<DayTypeSummary> {
    let mut sums: BTreeMap<DayType, (f64, usize)> = BTreeMap::new();
    for t in trips {
        let entry = sums.entry(t.day_type).or_default();
        entry.0 += t.total_amount;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(day_type, (revenue, trip_count))| DayTypeSummary {
            day_type,
            revenue,
            trip_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::sample_table;
    use approx::assert_relative_eq;

    #[test]
    fn test_daily_counts_sorted_by_date() {
        let table = sample_table();
        let daily = daily_counts(table.rows());
        let counts: Vec<usize> = daily.iter().map(|d| d.trip_count).collect();
        assert_eq!(counts, vec![2, 1, 1, 1, 1]);
        assert!(daily.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_day_type_summary() {
        let table = sample_table();
        let summary = day_type_summary(table.rows());
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].day_type, DayType::Weekday);
        assert_eq!(summary[0].trip_count, 4);
        assert_eq!(summary[1].day_type, DayType::Weekend);
        assert_eq!(summary[1].trip_count, 2);
        // weekend rows: fare 10 tip 0, fare 19 tip 4, each + 1
        assert_relative_eq!(summary[1].revenue, 35.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hour_day_type_counts_sum_to_total() {
        let table = sample_table();
        let cells = hour_day_type_counts(table.rows());
        assert_eq!(cells.iter().map(|c| c.trip_count).sum::<usize>(), table.len());
        assert!(cells.iter().any(|c| c.hour == 23 && c.day_type == DayType::Weekend));
    }

    #[test]
    fn test_hourly_summary() {
        let table = sample_table();
        let hourly = hourly_summary(table.rows());
        let seven = hourly.iter().find(|h| h.hour == 7).unwrap();
        assert_eq!(seven.trip_count, 1);
        assert_relative_eq!(seven.revenue, 19.0, epsilon = 1e-9);
        assert_relative_eq!(seven.avg_fare, 15.0, epsilon = 1e-9);
        assert_relative_eq!(seven.avg_tip, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_passenger_distribution_skips_unknown() {
        let table = sample_table();
        let buckets = passenger_distribution(table.rows());
        let pairs: Vec<(u32, usize)> = buckets
            .iter()
            .map(|b| (b.passenger_count, b.trip_count))
            .collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2), (2, 1), (3, 1)]);
    }

    #[test]
    fn test_fare_box_quartiles_and_outliers() {
        let fares = [10.0, 11.0, 12.0, 13.0, 14.0, 100.0];
        let b = FareBox::from_fares(1, &fares).unwrap();
        assert_eq!(b.trip_count, 6);
        assert_eq!(b.min, 10.0);
        assert_eq!(b.max, 100.0);
        assert_relative_eq!(b.q1, 11.25, epsilon = 1e-9);
        assert_relative_eq!(b.median, 12.5, epsilon = 1e-9);
        assert_relative_eq!(b.q3, 13.75, epsilon = 1e-9);
        assert_eq!(b.lower_whisker, 10.0);
        assert_eq!(b.upper_whisker, 14.0);
        assert_eq!(b.outliers, vec![100.0]);
        assert_eq!(FareBox::from_fares(1, &[]), None);
    }

    #[test]
    fn test_fare_by_passengers_skips_unknown() {
        let table = sample_table();
        let boxes = fare_by_passengers(table.rows());
        let counts: Vec<(u32, usize)> = boxes.iter().map(|b| (b.passenger_count, b.trip_count)).collect();
        assert_eq!(counts, vec![(0, 1), (1, 2), (2, 1), (3, 1)]);
        // one-passenger fares 15 and 22
        assert_relative_eq!(boxes[1].median, 18.5, epsilon = 1e-9);
        assert!(boxes.iter().all(|b| b.outliers.is_empty()));
    }

    #[test]
    fn test_top_pickup_zones_ranked() {
        let table = sample_table();
        let top = top_pickup_zones(table.rows(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].zone, "JFK Airport");
        assert_eq!(top[0].trip_count, 2);
        assert_eq!(top[1].zone, "Midtown Center");
    }

    #[test]
    fn test_top_zone_revenue_ranked() {
        let table = sample_table();
        let top = top_zone_revenue(table.rows(), 1);
        assert_eq!(top[0].zone, "JFK Airport");
        // (34 + 7 + 1 + 22 + 0 + 1) / 2
        assert_relative_eq!(top[0].avg_revenue, 32.5, epsilon = 1e-9);
    }

    #[test]
    fn test_dropoff_and_heatmap() {
        let table = sample_table();
        let dropoffs = top_dropoff_locations(table.rows(), DEFAULT_TOP_N);
        assert_eq!(dropoffs, vec![DropoffCount { location_id: 236, trip_count: 6 }]);

        let heatmap = hour_zone_heatmap(table.rows());
        assert_eq!(heatmap.iter().map(|c| c.trip_count).sum::<usize>(), 6);
        assert_eq!(heatmap[0].hour, 2);
        assert_eq!(heatmap[0].zone, "East Village");
    }

    #[test]
    fn test_histogram_bins() {
        let h = Histogram::build(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert_eq!(h.total(), 5);

        let flat = Histogram::build(&[7.0, 7.0], 2);
        assert_eq!(flat.edges, vec![6.5, 7.0, 7.5]);
        assert_eq!(flat.counts, vec![0, 2]);

        assert_eq!(Histogram::build(&[], 10).total(), 0);
    }

    #[test]
    fn test_aggregates_on_empty_selection() {
        let aggregates = DashboardAggregates::compute(&[], DEFAULT_TOP_N);
        assert!(aggregates.daily_counts.is_empty());
        assert!(aggregates.top_pickup_zones.is_empty());
        assert!(aggregates.day_type_summary.is_empty());
        assert!(aggregates.fare_by_passengers.is_empty());
        assert!(aggregates.fare_per_mile_histogram.counts.is_empty());
    }

    #[test]
    fn test_histograms_exclude_undefined_values() {
        let table = sample_table();
        let aggregates = DashboardAggregates::compute(table.rows(), DEFAULT_TOP_N);
        // one zero-distance trip, one zero-duration trip (the same row)
        assert_eq!(aggregates.fare_per_mile_histogram.total(), 5);
        assert_eq!(aggregates.speed_histogram.total(), 5);
        assert_eq!(aggregates.fare_per_mile_histogram.counts.len(), FARE_PER_MILE_BINS);
    }
}
