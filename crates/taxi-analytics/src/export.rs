//! CSV export of filtered trips and of their column summary.

use crate::error::Result;
use crate::metrics::{mean, quantile_linear};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use taxi_domain::EnrichedTrip;
use tracing::info;

/// File name offered for the filtered trips download.
pub const TRIPS_EXPORT_FILE: &str = "nyc_taxi_filtered_trips.csv";

/// File name offered for the summary download.
pub const SUMMARY_EXPORT_FILE: &str = "nyc_taxi_data_summary.csv";

/// Write trips as CSV with a header row, in the given order.
pub fn write_trips_csv<W: Write>(trips: &[EnrichedTrip], writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for trip in trips {
        writer.serialize(trip)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read trips back from CSV written by [`write_trips_csv`].
pub fn read_trips_csv<R: Read>(reader: R) -> Result<Vec<EnrichedTrip>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let trips = reader
        .deserialize::<EnrichedTrip>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(trips)
}

/// Export trips to a CSV file.
pub fn export_trips<P: AsRef<Path>>(trips: &[EnrichedTrip], path: P) -> Result<()> {
    write_trips_csv(trips, File::create(path.as_ref())?)?;
    info!(path = %path.as_ref().display(), rows = trips.len(), "Trips exported");
    Ok(())
}

/// Descriptive statistics for one numeric column. Undefined values are not
/// counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    pub fn describe(column: &str, values: &[f64]) -> Self {
        let std = (values.len() > 1).then(|| values.iter().std_dev());
        let min = values.iter().copied().reduce(f64::min);
        let max = values.iter().copied().reduce(f64::max);

        Self {
            column: column.to_string(),
            count: values.len(),
            mean: mean(values),
            std,
            min,
            p25: quantile_linear(values, 0.25),
            p50: quantile_linear(values, 0.5),
            p75: quantile_linear(values, 0.75),
            max,
        }
    }
}

type Extractor = fn(&EnrichedTrip) -> Option<f64>;

const NUMERIC_COLUMNS: &[(&str, Extractor)] = &[
    ("passenger_count", |t| t.passenger_count.map(f64::from)),
    ("trip_distance", |t| Some(t.trip_distance)),
    ("fare_amount", |t| Some(t.fare_amount)),
    ("tip_amount", |t| Some(t.tip_amount)),
    ("total_amount", |t| Some(t.total_amount)),
    ("hour", |t| Some(f64::from(t.hour))),
    ("duration_minutes", |t| Some(t.duration_minutes)),
    ("fare_per_mile", |t| t.fare_per_mile),
    ("speed_mph", |t| t.speed_mph),
];

/// Summaries for every numeric column of the trips.
pub fn summary_rows(trips: &[EnrichedTrip]) -> Vec<ColumnSummary> {
    NUMERIC_COLUMNS
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = trips.iter().filter_map(extract).collect();
            ColumnSummary::describe(name, &values)
        })
        .collect()
}

/// Write the column summary as CSV.
pub fn write_summary_csv<W: Write>(trips: &[EnrichedTrip], writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in summary_rows(trips) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Export the column summary to a CSV file.
pub fn export_summary<P: AsRef<Path>>(trips: &[EnrichedTrip], path: P) -> Result<()> {
    write_summary_csv(trips, File::create(path.as_ref())?)?;
    info!(path = %path.as_ref().display(), "Summary exported");
    Ok(())
}
