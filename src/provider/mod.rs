//! Weather provider boundary
//!
//! The derivation pipeline never talks to the network itself; it consumes a
//! [`ProviderReport`] produced behind this trait. The real implementation
//! fetches Open-Meteo forecast and archive data; the fixture implementation
//! serves deterministic reports for tests and the demo path.

use crate::Result;
use crate::models::{Location, QuerySettings, WeatherKind};
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod open_meteo;

pub use open_meteo::OpenMeteoProvider;

/// Request handed to a weather provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    /// Target calendar date
    pub date: NaiveDate,
    /// Query location
    pub location: Location,
    /// Include the historical archive source
    pub include_historical: bool,
    /// Include the forecast source
    pub include_forecast: bool,
}

impl ProviderRequest {
    /// Build a request from captured settings and a location
    #[must_use]
    pub fn from_settings(settings: &QuerySettings, location: &Location) -> Self {
        Self {
            date: settings.date,
            location: location.clone(),
            include_historical: settings.include_historical,
            include_forecast: settings.include_forecast,
        }
    }
}

/// Raw per-kind probabilities reported by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReport {
    /// ISO date the report describes
    pub date: String,
    /// Daily maximum temperature, when the source carries one
    pub temperature_c: Option<f32>,
    /// Daily precipitation sum in mm, when the source carries one
    pub rainfall_mm: Option<f32>,
    /// Ordered per-kind probabilities, each in [0, 100]
    pub probabilities: Vec<(WeatherKind, u8)>,
}

/// External weather data source
///
/// `fetch` is the single suspension point of a query run; implementations
/// must combine their sources according to the request's toggles. Both
/// toggles off never reaches a provider (rejected during validation).
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderReport>;
}

/// Deterministic in-memory provider for tests and the demo path
///
/// Defaults to the dashboard's original fixture values.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    probabilities: Vec<(WeatherKind, u8)>,
}

impl FixtureProvider {
    /// Fixture with the original dashboard card values
    #[must_use]
    pub fn new() -> Self {
        Self {
            probabilities: vec![
                (WeatherKind::Rain, 73),
                (WeatherKind::Storm, 25),
                (WeatherKind::Wind, 45),
                (WeatherKind::Cloudy, 82),
            ],
        }
    }

    /// Fixture with caller-chosen probabilities
    #[must_use]
    pub fn with_probabilities(probabilities: Vec<(WeatherKind, u8)>) -> Self {
        Self { probabilities }
    }
}

impl Default for FixtureProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherProvider for FixtureProvider {
    async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderReport> {
        Ok(ProviderReport {
            date: request.date.format("%Y-%m-%d").to_string(),
            temperature_c: Some(25.0),
            rainfall_mm: Some(50.0),
            probabilities: self.probabilities.clone(),
        })
    }
}
