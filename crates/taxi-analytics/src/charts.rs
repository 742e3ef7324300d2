//! Chart specifications handed to an external charting front end.
//!
//! Nothing here draws anything. Each builder turns one aggregate into
//! x/y series (optionally grouped) plus titles and axis labels, and the
//! whole set serializes to JSON.

use crate::aggregates::{DashboardAggregates, FareBox, Histogram};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use taxi_domain::{DayType, EnrichedTrip};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    StackedBar,
    Histogram,
    Heatmap,
    Scatter,
    Box,
}

/// Rows plotted in the fare vs distance scatter, taken in filtered order.
pub const SCATTER_SAMPLE_ROWS: usize = 1000;

/// Labels of the five box statistics, in the order box series carry them.
pub const BOX_STATS: [&str; 5] = ["lower_whisker", "q1", "median", "q3", "upper_whisker"];

/// x label of each outlier point in a box series.
pub const BOX_OUTLIER: &str = "outlier";

/// One x/y series. For heatmaps `x` holds the column labels, `group` the row
/// label and `y` the cell values. Scatter points keep their numeric x as
/// text. A box series lists the [`BOX_STATS`] values followed by one
/// [`BOX_OUTLIER`] point per outlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub group: Option<String>,
}

impl Series {
    fn new(name: impl Into<String>, points: impl IntoIterator<Item = (String, f64)>) -> Self {
        let (x, y) = points.into_iter().unzip();
        Self {
            name: name.into(),
            x,
            y,
            group: None,
        }
    }

    fn grouped(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl ChartSpec {
    fn new(title: &str, kind: ChartKind, x_label: &str, y_label: &str, series: Vec<Series>) -> Self {
        Self {
            title: title.to_string(),
            kind,
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            series,
        }
    }

    /// True when no series carries a point, i.e. the "no data" state.
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(Series::is_empty)
    }
}

fn count(n: usize) -> f64 {
    n as f64
}

pub fn daily_trips_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    let series = Series::new(
        "Trips",
        aggregates
            .daily_counts
            .iter()
            .map(|d| (d.date.to_string(), count(d.trip_count))),
    );
    ChartSpec::new("Trips per Day", ChartKind::Line, "Date", "Trips", vec![series])
}

/// One stacked series per day type, each over the hours it has trips in.
pub fn hourly_day_type_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    let mut by_type: BTreeMap<DayType, Vec<(String, f64)>> = BTreeMap::new();
    for cell in &aggregates.hour_day_type_counts {
        by_type
            .entry(cell.day_type)
            .or_default()
            .push((cell.hour.to_string(), count(cell.trip_count)));
    }
    let series = by_type
        .into_iter()
        .map(|(day_type, points)| Series::new(day_type.as_str(), points).grouped(day_type.as_str()))
        .collect();
    ChartSpec::new(
        "Trips by Hour and Day Type",
        ChartKind::StackedBar,
        "Hour of Day",
        "Trips",
        series,
    )
}

pub fn revenue_by_hour_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    let series = Series::new(
        "Revenue",
        aggregates.hourly.iter().map(|h| (h.hour.to_string(), h.revenue)),
    );
    ChartSpec::new("Revenue by Hour", ChartKind::Bar, "Hour of Day", "Revenue ($)", vec![series])
}

pub fn fare_tip_by_hour_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    let fares = Series::new(
        "Average Fare",
        aggregates.hourly.iter().map(|h| (h.hour.to_string(), h.avg_fare)),
    );
    let tips = Series::new(
        "Average Tip",
        aggregates.hourly.iter().map(|h| (h.hour.to_string(), h.avg_tip)),
    );
    ChartSpec::new(
        "Average Fare and Tip by Hour",
        ChartKind::Line,
        "Hour of Day",
        "Amount ($)",
        vec![fares, tips],
    )
}

pub fn passenger_distribution_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    let series = Series::new(
        "Trips",
        aggregates
            .passenger_distribution
            .iter()
            .map(|b| (b.passenger_count.to_string(), count(b.trip_count))),
    );
    ChartSpec::new(
        "Passenger Count Distribution",
        ChartKind::Bar,
        "Passengers",
        "Trips",
        vec![series],
    )
}

pub fn top_pickup_zones_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    let series = Series::new(
        "Trips",
        aggregates
            .top_pickup_zones
            .iter()
            .map(|z| (z.zone.clone(), count(z.trip_count))),
    );
    ChartSpec::new("Top Pickup Zones", ChartKind::Bar, "Zone", "Trips", vec![series])
}

pub fn top_dropoff_locations_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    let series = Series::new(
        "Trips",
        aggregates
            .top_dropoff_locations
            .iter()
            .map(|l| (l.location_id.to_string(), count(l.trip_count))),
    );
    ChartSpec::new(
        "Top Dropoff Locations",
        ChartKind::Bar,
        "Dropoff Location ID",
        "Trips",
        vec![series],
    )
}

/// One row series per zone, columns are hours 0-23 with zeros for empty cells.
pub fn hour_zone_heatmap_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    let hours: Vec<String> = (0..24).map(|h: u32| h.to_string()).collect();
    let mut rows: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for cell in &aggregates.hour_zone_heatmap {
        let row = rows.entry(cell.zone.as_str()).or_insert_with(|| vec![0.0; 24]);
        row[cell.hour as usize] += count(cell.trip_count);
    }
    let series = rows
        .into_iter()
        .map(|(zone, y)| Series {
            name: zone.to_string(),
            x: hours.clone(),
            y,
            group: Some(zone.to_string()),
        })
        .collect();
    ChartSpec::new(
        "Trips by Hour and Pickup Zone",
        ChartKind::Heatmap,
        "Hour of Day",
        "Pickup Zone",
        series,
    )
}

pub fn zone_revenue_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    let series = Series::new(
        "Average Revenue",
        aggregates
            .top_zone_revenue
            .iter()
            .map(|z| (z.zone.clone(), z.avg_revenue)),
    );
    ChartSpec::new(
        "Average Revenue per Trip by Zone",
        ChartKind::Bar,
        "Zone",
        "Revenue per Trip ($)",
        vec![series],
    )
}

pub fn day_type_revenue_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    let revenue = Series::new(
        "Revenue",
        aggregates
            .day_type_summary
            .iter()
            .map(|d| (d.day_type.to_string(), d.revenue)),
    );
    let trips = Series::new(
        "Trips",
        aggregates
            .day_type_summary
            .iter()
            .map(|d| (d.day_type.to_string(), count(d.trip_count))),
    );
    ChartSpec::new(
        "Weekday vs Weekend",
        ChartKind::Bar,
        "Day Type",
        "Value",
        vec![revenue, trips],
    )
}

fn scatter<'a>(
    name: &str,
    trips: impl IntoIterator<Item = &'a EnrichedTrip>,
    point: fn(&EnrichedTrip) -> (f64, f64),
) -> Series {
    Series::new(
        name,
        trips.into_iter().map(|t| {
            let (x, y) = point(t);
            (x.to_string(), y)
        }),
    )
}

/// Fare against distance for the first [`SCATTER_SAMPLE_ROWS`] trips.
pub fn fare_distance_scatter_chart(trips: &[EnrichedTrip]) -> ChartSpec {
    let series = scatter("Trips", trips.iter().take(SCATTER_SAMPLE_ROWS), |t| {
        (t.trip_distance, t.fare_amount)
    });
    ChartSpec::new(
        "Fare vs Distance",
        ChartKind::Scatter,
        "Distance (miles)",
        "Fare ($)",
        vec![series],
    )
}

pub fn tip_fare_scatter_chart(trips: &[EnrichedTrip]) -> ChartSpec {
    let series = scatter("Trips", trips, |t| (t.fare_amount, t.tip_amount));
    ChartSpec::new("Tip vs Fare", ChartKind::Scatter, "Fare ($)", "Tip ($)", vec![series])
}

pub fn duration_distance_scatter_chart(trips: &[EnrichedTrip]) -> ChartSpec {
    let series = scatter("Trips", trips, |t| (t.trip_distance, t.duration_minutes));
    ChartSpec::new(
        "Duration vs Distance",
        ChartKind::Scatter,
        "Distance (miles)",
        "Duration (mins)",
        vec![series],
    )
}

fn box_series(fare_box: &FareBox) -> Series {
    let label = fare_box.passenger_count.to_string();
    let stats = [
        fare_box.lower_whisker,
        fare_box.q1,
        fare_box.median,
        fare_box.q3,
        fare_box.upper_whisker,
    ];
    let points = BOX_STATS
        .iter()
        .map(|s| (*s).to_string())
        .zip(stats)
        .chain(fare_box.outliers.iter().map(|&f| (BOX_OUTLIER.to_string(), f)));
    Series::new(label.clone(), points).grouped(label)
}

/// One box per known passenger count.
pub fn fare_by_passengers_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    ChartSpec::new(
        "Fare Amount Distribution by Passenger Count",
        ChartKind::Box,
        "Passengers",
        "Fare ($)",
        aggregates.fare_by_passengers.iter().map(box_series).collect(),
    )
}

/// Bars labelled by their lower edge.
fn histogram_series(name: &str, histogram: &Histogram) -> Series {
    Series::new(
        name,
        histogram
            .edges
            .iter()
            .zip(&histogram.counts)
            .map(|(edge, &n)| (format!("{edge:.2}"), count(n))),
    )
}

pub fn fare_per_mile_histogram_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    ChartSpec::new(
        "Fare per Mile Distribution",
        ChartKind::Histogram,
        "Fare per Mile ($)",
        "Trips",
        vec![histogram_series("Fare per Mile", &aggregates.fare_per_mile_histogram)],
    )
}

pub fn speed_histogram_chart(aggregates: &DashboardAggregates) -> ChartSpec {
    ChartSpec::new(
        "Speed Distribution",
        ChartKind::Histogram,
        "Speed (mph)",
        "Trips",
        vec![histogram_series("Speed", &aggregates.speed_histogram)],
    )
}

/// Every dashboard chart, in display order. `trips` is the filtered
/// selection the aggregates were computed from.
pub fn dashboard_charts(trips: &[EnrichedTrip], aggregates: &DashboardAggregates) -> Vec<ChartSpec> {
    vec![
        daily_trips_chart(aggregates),
        hourly_day_type_chart(aggregates),
        fare_by_passengers_chart(aggregates),
        revenue_by_hour_chart(aggregates),
        passenger_distribution_chart(aggregates),
        top_pickup_zones_chart(aggregates),
        top_dropoff_locations_chart(aggregates),
        fare_distance_scatter_chart(trips),
        hour_zone_heatmap_chart(aggregates),
        tip_fare_scatter_chart(trips),
        duration_distance_scatter_chart(trips),
        zone_revenue_chart(aggregates),
        day_type_revenue_chart(aggregates),
        fare_per_mile_histogram_chart(aggregates),
        speed_histogram_chart(aggregates),
        fare_tip_by_hour_chart(aggregates),
    ]
}

pub fn charts_json(charts: &[ChartSpec]) -> Result<String> {
    Ok(serde_json::to_string_pretty(charts)?)
}

pub fn export_charts<P: AsRef<Path>>(charts: &[ChartSpec], path: P) -> Result<()> {
    std::fs::write(path.as_ref(), charts_json(charts)?)?;
    info!(path = %path.as_ref().display(), charts = charts.len(), "Chart specs exported");
    Ok(())
}
