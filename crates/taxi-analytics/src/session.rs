//! Session-scoped filter selections.

use crate::error::Result;
use crate::table::TripTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use taxi_domain::FilterCriteria;

/// Minimum passenger count selected when a session starts.
pub const DEFAULT_MIN_PASSENGERS: u32 = 1;

/// The filter values a viewer has selected, carried explicitly between
/// interactions instead of living in process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub date_range: (NaiveDate, NaiveDate),
    pub hour_range: (u32, u32),
    pub min_passengers: u32,
    pub selected_zones: BTreeSet<String>,
}

impl SessionState {
    /// Initial selections for a freshly loaded table: the full date span,
    /// every hour, at least one passenger and every zone.
    pub fn initial(table: &TripTable) -> Self {
        let full = table.unrestricted_criteria();
        Self {
            date_range: (full.start_date, full.end_date),
            hour_range: (0, 23),
            min_passengers: DEFAULT_MIN_PASSENGERS,
            selected_zones: full.allowed_zones,
        }
    }

    /// Select a single day or a span. A lone start date selects that day.
    pub fn select_dates(&mut self, start: NaiveDate, end: Option<NaiveDate>) {
        self.date_range = (start, end.unwrap_or(start));
    }

    /// Turn the selections into validated filter criteria.
    pub fn criteria(&self) -> Result<FilterCriteria> {
        let criteria = FilterCriteria {
            start_date: self.date_range.0,
            end_date: self.date_range.1,
            hour_start: self.hour_range.0,
            hour_end: self.hour_range.1,
            min_passengers: self.min_passengers,
            allowed_zones: self.selected_zones.clone(),
        };
        criteria.validate()?;
        Ok(criteria)
    }
}
