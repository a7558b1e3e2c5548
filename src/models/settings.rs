//! Query settings captured from the controls surface

use crate::{ParadecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound for the wind speed threshold slider, in mph
pub const MAX_WIND_THRESHOLD_MPH: u8 = 50;

/// Kind of event the user is planning for
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Outdoor,
    Wedding,
    Festival,
    Sports,
    Picnic,
    Parade,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Outdoor => write!(f, "Outdoor Event"),
            EventType::Wedding => write!(f, "Wedding"),
            EventType::Festival => write!(f, "Festival"),
            EventType::Sports => write!(f, "Sports Event"),
            EventType::Picnic => write!(f, "Picnic"),
            EventType::Parade => write!(f, "Parade"),
        }
    }
}

/// User-configured query settings
///
/// Mutated field-by-field by the controls surface; the orchestrator captures
/// a full copy at run time, so later edits never retroactively alter an
/// already-run query.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuerySettings {
    /// Target calendar date for the event
    pub date: NaiveDate,
    /// Kind of event being planned
    pub event_type: EventType,
    /// Precipitation probability threshold in percent (0-100)
    pub precipitation_threshold: u8,
    /// Wind speed threshold in mph (0-50)
    pub wind_threshold: u8,
    /// Include the historical archive data source
    pub include_historical: bool,
    /// Include the forecast data source
    pub include_forecast: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap_or_default(),
            event_type: EventType::Outdoor,
            precipitation_threshold: 50,
            wind_threshold: 25,
            include_historical: true,
            include_forecast: true,
        }
    }
}

impl QuerySettings {
    /// Validate thresholds and data-source toggles
    ///
    /// A query with both sources disabled has nothing to derive from and is
    /// rejected before any fetch or derivation runs.
    pub fn validate(&self) -> Result<()> {
        if !self.include_historical && !self.include_forecast {
            return Err(ParadecastError::invalid_settings(
                "at least one of historical/forecast data sources must be enabled",
            ));
        }
        if self.wind_threshold > MAX_WIND_THRESHOLD_MPH {
            return Err(ParadecastError::invalid_settings(format!(
                "wind threshold {} mph exceeds maximum {} mph",
                self.wind_threshold, MAX_WIND_THRESHOLD_MPH
            )));
        }
        Ok(())
    }
}
