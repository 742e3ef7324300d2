//! Dashboard report generation.

use crate::aggregates::{DashboardAggregates, DEFAULT_TOP_N};
use crate::error::Result;
use crate::metrics::{FareAnomalies, KeyMetrics, ANOMALY_QUANTILE};
use crate::table::TripTable;
use serde::{Deserialize, Serialize};
use taxi_domain::{EnrichedTrip, FilterCriteria, TIMESTAMP_OUTPUT_FORMAT};

/// Number of anomalous trips listed in a report.
pub const ANOMALY_PREVIEW_ROWS: usize = 10;

/// Columns of an anomalous trip shown in the preview table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRow {
    pub pickup_datetime: String,
    pub pickup_zone: String,
    pub trip_distance: f64,
    pub fare_amount: f64,
    pub fare_per_mile: Option<f64>,
}

impl From<&EnrichedTrip> for AnomalyRow {
    fn from(trip: &EnrichedTrip) -> Self {
        Self {
            pickup_datetime: trip.pickup_datetime.format(TIMESTAMP_OUTPUT_FORMAT).to_string(),
            pickup_zone: trip.pickup_zone.clone(),
            trip_distance: trip.trip_distance,
            fare_amount: trip.fare_amount,
            fare_per_mile: trip.fare_per_mile,
        }
    }
}

/// Everything the dashboard shows for one filter selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub generated_at: String,
    pub loaded_trips: usize,
    pub criteria: FilterCriteria,
    pub metrics: KeyMetrics,
    pub aggregates: DashboardAggregates,
    pub anomaly_threshold: Option<f64>,
    pub anomaly_count: usize,
    pub anomalies: Vec<AnomalyRow>,
}

impl DashboardReport {
    /// Run the filter and every aggregation over `table`.
    pub fn build(table: &TripTable, criteria: &FilterCriteria) -> Self {
        Self::from_filtered(table.len(), criteria, &table.filter(criteria))
    }

    /// Aggregate a selection already produced by `criteria` out of
    /// `loaded_trips` rows.
    pub fn from_filtered(loaded_trips: usize, criteria: &FilterCriteria, filtered: &TripTable) -> Self {
        let rows = filtered.rows();
        let anomalies = FareAnomalies::detect(rows, ANOMALY_QUANTILE);

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            loaded_trips,
            criteria: criteria.clone(),
            metrics: KeyMetrics::compute(rows),
            aggregates: DashboardAggregates::compute(rows, DEFAULT_TOP_N),
            anomaly_threshold: anomalies.threshold,
            anomaly_count: anomalies.trips.len(),
            anomalies: anomalies
                .trips
                .iter()
                .take(ANOMALY_PREVIEW_ROWS)
                .map(AnomalyRow::from)
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_markdown(&self) -> String {
        let m = &self.metrics;
        let a = &self.aggregates;

        let mut md = String::new();
        md.push_str("# NYC Yellow Taxi Trips Dashboard\n\n");
        md.push_str(&format!("**Generated:** {}\n\n", self.generated_at));

        md.push_str("## Filters\n\n");
        md.push_str("| Filter | Value |\n");
        md.push_str("|--------|-------|\n");
        md.push_str(&format!(
            "| Dates | {} to {} |\n",
            self.criteria.start_date, self.criteria.end_date
        ));
        md.push_str(&format!(
            "| Hours | {}-{} |\n",
            self.criteria.hour_start, self.criteria.hour_end
        ));
        md.push_str(&format!("| Min Passengers | {} |\n", self.criteria.min_passengers));
        md.push_str(&format!("| Zones | {} selected |\n", self.criteria.allowed_zones.len()));
        md.push_str(&format!("| Trips Loaded | {} |\n\n", self.loaded_trips));

        md.push_str("## Key Metrics\n\n");
        if m.trip_count == 0 {
            md.push_str("_No trips match the current filters._\n\n");
        }
        md.push_str("| Metric | Value |\n");
        md.push_str("|--------|-------|\n");
        md.push_str(&format!("| Trips | {} |\n", m.trip_count));
        md.push_str(&format!("| Median Fare | {} |\n", money(m.median_fare)));
        md.push_str(&format!("| Total Revenue | ${:.2} |\n", m.total_revenue));
        md.push_str(&format!("| Total Tips | ${:.2} |\n", m.total_tips));
        md.push_str(&format!("| Avg Tip % | {:.2}% |\n", m.avg_tip_pct));
        md.push_str(&format!("| No-Tip Trips | {:.2}% |\n", m.no_tip_pct));
        md.push_str(&format!(
            "| Avg Speed | {} |\n",
            m.avg_speed_mph
                .map_or_else(|| "N/A".to_string(), |v| format!("{v:.2} mph"))
        ));
        md.push_str(&format!(
            "| Duration/Distance Correlation | {} |\n\n",
            m.duration_distance_correlation
                .map_or_else(|| "N/A".to_string(), |v| format!("{v:.3}"))
        ));

        if !a.top_pickup_zones.is_empty() {
            md.push_str("## Top Pickup Zones\n\n");
            md.push_str("| Rank | Zone | Trips |\n");
            md.push_str("|------|------|-------|\n");
            for (i, zone) in a.top_pickup_zones.iter().enumerate() {
                md.push_str(&format!("| {} | {} | {} |\n", i + 1, cell(&zone.zone), zone.trip_count));
            }
            md.push('\n');
        }

        if !a.hourly.is_empty() {
            md.push_str("## By Hour\n\n");
            md.push_str("| Hour | Trips | Revenue | Avg Fare | Avg Tip |\n");
            md.push_str("|------|-------|---------|----------|---------|\n");
            for h in &a.hourly {
                md.push_str(&format!(
                    "| {} | {} | ${:.2} | ${:.2} | ${:.2} |\n",
                    h.hour, h.trip_count, h.revenue, h.avg_fare, h.avg_tip
                ));
            }
            md.push('\n');
        }

        if !a.day_type_summary.is_empty() {
            md.push_str("## Weekday vs Weekend\n\n");
            md.push_str("| Day Type | Trips | Revenue |\n");
            md.push_str("|----------|-------|---------|\n");
            for d in &a.day_type_summary {
                md.push_str(&format!("| {} | {} | ${:.2} |\n", d.day_type, d.trip_count, d.revenue));
            }
            md.push('\n');
        }

        if !a.fare_by_passengers.is_empty() {
            md.push_str("## Fare by Passenger Count\n\n");
            md.push_str("| Passengers | Trips | Min | Q1 | Median | Q3 | Max | Outliers |\n");
            md.push_str("|------------|-------|-----|----|--------|----|-----|----------|\n");
            for b in &a.fare_by_passengers {
                md.push_str(&format!(
                    "| {} | {} | ${:.2} | ${:.2} | ${:.2} | ${:.2} | ${:.2} | {} |\n",
                    b.passenger_count,
                    b.trip_count,
                    b.min,
                    b.q1,
                    b.median,
                    b.q3,
                    b.max,
                    b.outliers.len()
                ));
            }
            md.push('\n');
        }

        if !a.top_zone_revenue.is_empty() {
            md.push_str("## Revenue per Trip by Zone\n\n");
            md.push_str("| Zone | Trips | Avg Revenue |\n");
            md.push_str("|------|-------|-------------|\n");
            for z in &a.top_zone_revenue {
                md.push_str(&format!(
                    "| {} | {} | ${:.2} |\n",
                    cell(&z.zone),
                    z.trip_count,
                    z.avg_revenue
                ));
            }
            md.push('\n');
        }

        md.push_str("## Fare Anomalies\n\n");
        match self.anomaly_threshold {
            Some(threshold) => md.push_str(&format!(
                "{} trips above the 99th percentile fare per mile (${threshold:.2}).\n\n",
                self.anomaly_count
            )),
            None => md.push_str("No fare-per-mile data.\n\n"),
        }
        if !self.anomalies.is_empty() {
            md.push_str("| Pickup | Zone | Distance | Fare | Fare/Mile |\n");
            md.push_str("|--------|------|----------|------|-----------|\n");
            for row in &self.anomalies {
                md.push_str(&format!(
                    "| {} | {} | {:.2} mi | ${:.2} | {} |\n",
                    row.pickup_datetime,
                    cell(&row.pickup_zone),
                    row.trip_distance,
                    row.fare_amount,
                    money(row.fare_per_mile)
                ));
            }
            md.push('\n');
        }

        md
    }
}

/// Escape a value for a Markdown table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("${v:.2}"))
}
