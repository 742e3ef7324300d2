//! Scalar summaries over a filtered set of trips.
//!
//! Undefined per-row ratios are handled two different ways on purpose:
//! the average tip percentage counts them as zero, while the average speed
//! leaves them out of both the sum and the count.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use taxi_domain::EnrichedTrip;

/// Quantile of `fare_per_mile` above which a trip is reported as an anomaly.
pub const ANOMALY_QUANTILE: f64 = 0.99;

/// Headline numbers for the current selection.
///
/// Over zero trips every count, sum and percentage is zero and every
/// statistic that needs data is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub trip_count: usize,
    pub median_fare: Option<f64>,
    pub total_revenue: f64,
    pub total_tips: f64,
    pub avg_tip_pct: f64,
    pub no_tip_pct: f64,
    pub avg_speed_mph: Option<f64>,
    pub duration_distance_correlation: Option<f64>,
}

impl KeyMetrics {
    pub fn compute(trips: &[EnrichedTrip]) -> Self {
        let fares: Vec<f64> = trips.iter().map(|t| t.fare_amount).collect();
        let tip_pcts: Vec<f64> = trips.iter().map(|t| t.tip_pct().unwrap_or(0.0)).collect();
        let speeds: Vec<f64> = trips.iter().filter_map(|t| t.speed_mph).collect();
        let durations: Vec<f64> = trips.iter().map(|t| t.duration_minutes).collect();
        let distances: Vec<f64> = trips.iter().map(|t| t.trip_distance).collect();
        let no_tip = trips.iter().filter(|t| t.no_tip).count();

        Self {
            trip_count: trips.len(),
            median_fare: median(&fares),
            total_revenue: trips.iter().map(|t| t.total_amount).sum(),
            total_tips: trips.iter().map(|t| t.tip_amount).sum(),
            avg_tip_pct: mean(&tip_pcts).unwrap_or(0.0),
            no_tip_pct: pct(no_tip, trips.len()),
            avg_speed_mph: mean(&speeds),
            duration_distance_correlation: pearson(&durations, &distances),
        }
    }
}

/// Share of `part` in `total` as a percentage, zero for an empty total.
pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Arithmetic mean, `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Median (average of the two middle values for even counts).
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Data::new(values.to_vec()).median())
}

/// Quantile with linear interpolation between closest ranks.
///
/// Position `q * (n - 1)` in the sorted values; matches the default
/// quantile of most dataframe libraries.
pub fn quantile_linear(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Pearson correlation coefficient.
///
/// `None` with fewer than two pairs or when either series is constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let covariance = xs.iter().covariance(ys.iter());
    let r = covariance / (xs.iter().std_dev() * ys.iter().std_dev());
    r.is_finite().then_some(r)
}

/// Trips whose fare per mile is above the anomaly threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareAnomalies {
    /// Threshold computed over defined `fare_per_mile` values only
    pub threshold: Option<f64>,
    pub trips: Vec<EnrichedTrip>,
}

impl FareAnomalies {
    /// Trips strictly above the `quantile` of `fare_per_mile`, order preserved.
    pub fn detect(trips: &[EnrichedTrip], quantile: f64) -> Self {
        let defined: Vec<f64> = trips.iter().filter_map(|t| t.fare_per_mile).collect();
        let threshold = quantile_linear(&defined, quantile);

        let trips = match threshold {
            Some(limit) => trips
                .iter()
                .filter(|t| t.fare_per_mile.is_some_and(|v| v > limit))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        Self { threshold, trips }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{enriched, sample_table};
    use approx::assert_relative_eq;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_quantile_linear() {
        let values: Vec<f64> = (1..=101).map(f64::from).collect();
        assert_eq!(quantile_linear(&values, 0.99), Some(100.0));
        assert_eq!(quantile_linear(&[1.0, 2.0], 0.5), Some(1.5));
        assert_relative_eq!(quantile_linear(&[4.0, 2.0], 0.99).unwrap(), 3.98, epsilon = 1e-12);
        assert_eq!(quantile_linear(&[], 0.5), None);
        assert_eq!(quantile_linear(&[1.0], 1.5), None);
    }

    #[test]
    fn test_pearson() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap(), -1.0, epsilon = 1e-12);
        assert_eq!(pearson(&xs, &[5.0, 5.0, 5.0, 5.0]), None);
        assert_eq!(pearson(&[1.0], &[2.0]), None);
    }

    #[test]
    fn test_no_tip_trips_metrics() {
        let trips = vec![
            enriched("2023-03-01 10:00:00", 10, Some(1), 2.0, 10.0, 0.0, "Midtown Center"),
            enriched("2023-03-01 11:00:00", 10, Some(1), 2.0, 10.0, 0.0, "Midtown Center"),
        ];
        let metrics = KeyMetrics::compute(&trips);
        assert_eq!(metrics.no_tip_pct, 100.0);
        assert_eq!(metrics.avg_tip_pct, 0.0);
    }

    #[test]
    fn test_tip_pct_zeroes_but_speed_excludes_undefined() {
        let trips = vec![
            // zero fare: tip percentage undefined, counted as 0
            enriched("2023-03-01 10:00:00", 30, Some(1), 5.0, 0.0, 2.0, "Midtown Center"),
            enriched("2023-03-01 11:00:00", 30, Some(1), 5.0, 20.0, 4.0, "Midtown Center"),
            // zero duration: speed undefined, left out
            enriched("2023-03-01 12:00:00", 0, Some(1), 1.0, 10.0, 1.0, "Midtown Center"),
        ];
        let metrics = KeyMetrics::compute(&trips);
        assert_relative_eq!(metrics.avg_tip_pct, (0.0 + 20.0 + 10.0) / 3.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.avg_speed_mph.unwrap(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_key_metrics_sample() {
        let table = sample_table();
        let metrics = KeyMetrics::compute(table.rows());
        assert_eq!(metrics.trip_count, 6);
        // fares 15, 8, 34, 10, 19, 22
        assert_eq!(metrics.median_fare, Some(17.0));
        assert_relative_eq!(metrics.total_tips, 14.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.total_revenue, 108.0 + 14.0 + 6.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.no_tip_pct, 50.0, epsilon = 1e-9);
        assert!(metrics.duration_distance_correlation.unwrap() > 0.5);
    }

    #[test]
    fn test_empty_selection_metrics() {
        let metrics = KeyMetrics::compute(&[]);
        assert_eq!(metrics.trip_count, 0);
        assert_eq!(metrics.median_fare, None);
        assert_eq!(metrics.total_revenue, 0.0);
        assert_eq!(metrics.total_tips, 0.0);
        assert_eq!(metrics.avg_tip_pct, 0.0);
        assert_eq!(metrics.no_tip_pct, 0.0);
        assert_eq!(metrics.avg_speed_mph, None);
        assert_eq!(metrics.duration_distance_correlation, None);
    }

    #[test]
    fn test_anomaly_threshold_ignores_undefined_fare_per_mile() {
        let trips = vec![
            enriched("2023-03-01 10:00:00", 10, Some(1), 0.0, 10.0, 0.0, "Midtown Center"),
            enriched("2023-03-01 11:00:00", 10, Some(1), 5.0, 20.0, 0.0, "Midtown Center"),
        ];
        let anomalies = FareAnomalies::detect(&trips, ANOMALY_QUANTILE);
        assert_eq!(anomalies.threshold, Some(4.0));
        assert!(anomalies.trips.is_empty());
    }

    #[test]
    fn test_anomalies_exceed_threshold() {
        let mut trips: Vec<EnrichedTrip> = (0..99)
            .map(|_| enriched("2023-03-01 10:00:00", 10, Some(1), 2.0, 10.0, 1.0, "Midtown Center"))
            .collect();
        trips.push(enriched("2023-03-01 11:00:00", 10, Some(1), 0.1, 50.0, 0.0, "JFK Airport"));

        let anomalies = FareAnomalies::detect(&trips, ANOMALY_QUANTILE);
        let threshold = anomalies.threshold.unwrap();
        assert!(threshold > 5.0 && threshold < 500.0);
        assert_eq!(anomalies.trips.len(), 1);
        assert_eq!(anomalies.trips[0].pickup_zone, "JFK Airport");
    }

    #[test]
    fn test_anomalies_on_empty_selection() {
        let anomalies = FareAnomalies::detect(&[], ANOMALY_QUANTILE);
        assert_eq!(anomalies.threshold, None);
        assert!(anomalies.trips.is_empty());
    }
}
