//! Taxi zone lookup reference data.

use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use taxi_domain::ZoneEntry;
use tracing::debug;

/// Reader for the TLC `taxi_zone_lookup.csv` file
/// (`LocationID,Borough,Zone,service_zone`).
#[derive(Debug, Clone)]
pub struct ZoneLookupFile {
    path: PathBuf,
}

impl ZoneLookupFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every zone row from the file.
    pub fn read_entries(&self) -> Result<Vec<ZoneEntry>> {
        read_zone_entries(csv::Reader::from_path(&self.path)?)
    }
}

/// Deserialize zone rows from any CSV reader with a header.
pub fn read_zone_entries<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<ZoneEntry>> {
    let entries = reader
        .deserialize::<ZoneEntry>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(count = entries.len(), "Zone lookup rows read");
    Ok(entries)
}

/// Location id to zone name mapping, built once per load.
#[derive(Debug, Clone, Default)]
pub struct ZoneNames {
    names: HashMap<i32, String>,
}

impl ZoneNames {
    pub fn from_entries(entries: &[ZoneEntry]) -> Self {
        Self {
            names: entries
                .iter()
                .map(|e| (e.location_id, e.zone.clone()))
                .collect(),
        }
    }

    /// Zone name for `location_id`, or the id itself as text when unknown.
    pub fn label(&self, location_id: i32) -> String {
        self.names
            .get(&location_id)
            .cloned()
            .unwrap_or_else(|| location_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
