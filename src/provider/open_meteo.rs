//! Open-Meteo weather provider
//!
//! Two sources back a report: the daily forecast endpoint and the 30-year
//! archive endpoint. The archive probability for a kind is the share of past
//! years whose same calendar date exceeded that kind's threshold. When both
//! toggles are on the sources are fetched concurrently and averaged.

use crate::models::{Location, WeatherKind};
use crate::{ParadecastError, Result, config::ProviderConfig};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{ProviderReport, ProviderRequest, WeatherProvider};

// Exceedance thresholds for the archive source
const WET_DAY_MM: f32 = 1.0;
const SNOW_DAY_CM: f32 = 0.1;
const STORM_WEATHER_CODE: u8 = 95;
const CLOUDY_DAY_PCT: f32 = 70.0;
const CLEAR_DAY_PCT: f32 = 30.0;
const WINDY_DAY_MPH: f32 = 20.0;

/// Wind speed at which the forecast wind probability saturates, in mph
const WIND_SCALE_MPH: f32 = 50.0;

/// Open-Meteo HTTP client with retry middleware
pub struct OpenMeteoProvider {
    client: ClientWithMiddleware,
    config: ProviderConfig,
}

impl OpenMeteoProvider {
    /// Create a new provider from configuration
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("paradecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ParadecastError::provider(format!("Failed to build HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, config })
    }

    #[instrument(skip(self), fields(lat = location.latitude, lon = location.longitude))]
    async fn fetch_forecast(&self, location: &Location, date: NaiveDate) -> Result<DailyRow> {
        let day = date.format("%Y-%m-%d");
        let url = format!(
            "{}/forecast?latitude={}&longitude={}&daily=temperature_2m_max,precipitation_probability_max,precipitation_sum,snowfall_sum,wind_speed_10m_max,cloud_cover_mean,weather_code&start_date={day}&end_date={day}&wind_speed_unit=mph&timezone=auto",
            self.config.base_url, location.latitude, location.longitude
        );

        let response = self.fetch_daily(&url).await?;
        response
            .row_for(date)
            .ok_or_else(|| ParadecastError::provider("Forecast response carried no daily data"))
    }

    #[instrument(skip(self), fields(lat = location.latitude, lon = location.longitude))]
    async fn fetch_archive(&self, location: &Location, date: NaiveDate) -> Result<Vec<DailyRow>> {
        let years = i32::try_from(self.config.historical_years).unwrap_or(30);
        let start = same_date_in_year(date, date.year() - years);
        let end = same_date_in_year(date, date.year() - 1);
        let url = format!(
            "{}/archive?latitude={}&longitude={}&daily=temperature_2m_max,precipitation_sum,snowfall_sum,wind_speed_10m_max,cloud_cover_mean,weather_code&start_date={}&end_date={}&wind_speed_unit=mph&timezone=auto",
            self.config.archive_url,
            location.latitude,
            location.longitude,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );

        let response = self.fetch_daily(&url).await?;
        let rows = response.rows_for_calendar_date(date.month(), date.day());
        if rows.is_empty() {
            return Err(ParadecastError::provider(
                "Archive response carried no matching calendar dates",
            ));
        }
        debug!(samples = rows.len(), "Collected archive samples");
        Ok(rows)
    }

    async fn fetch_daily(&self, url: &str) -> Result<DailyResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ParadecastError::provider(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ParadecastError::provider(format!(
                "Provider returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<DailyResponse>()
            .await
            .map_err(|e| ParadecastError::provider(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    #[instrument(skip(self, request), fields(date = %request.date, location = %request.location.name))]
    async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderReport> {
        let (forecast, archive) = match (request.include_forecast, request.include_historical) {
            (true, true) => {
                let (forecast, archive) = futures::try_join!(
                    self.fetch_forecast(&request.location, request.date),
                    self.fetch_archive(&request.location, request.date),
                )?;
                (Some(forecast), Some(archive))
            }
            (true, false) => (
                Some(self.fetch_forecast(&request.location, request.date).await?),
                None,
            ),
            (false, true) => (
                None,
                Some(self.fetch_archive(&request.location, request.date).await?),
            ),
            (false, false) => {
                // Never reached; validation rejects this before the fetch
                warn!("Provider reached with both sources disabled");
                return Err(ParadecastError::invalid_settings(
                    "both data sources disabled",
                ));
            }
        };

        let forecast_probs = forecast.as_ref().map(forecast_probabilities);
        let archive_probs = archive.as_deref().map(archive_probabilities);

        let probabilities = WeatherKind::ALL
            .iter()
            .map(|&kind| {
                let value = match (&forecast_probs, &archive_probs) {
                    (Some(f), Some(a)) => {
                        u8::try_from((u16::from(probability_of(f, kind))
                            + u16::from(probability_of(a, kind)))
                            / 2)
                        .unwrap_or(100)
                    }
                    (Some(f), None) => probability_of(f, kind),
                    (None, Some(a)) => probability_of(a, kind),
                    (None, None) => 0,
                };
                (kind, value)
            })
            .collect();

        Ok(ProviderReport {
            date: request.date.format("%Y-%m-%d").to_string(),
            temperature_c: forecast
                .as_ref()
                .and_then(|row| row.temperature_max)
                .or_else(|| {
                    archive
                        .as_ref()
                        .and_then(|rows| rows.last())
                        .and_then(|row| row.temperature_max)
                }),
            rainfall_mm: forecast.as_ref().and_then(|row| row.precipitation_sum),
            probabilities,
        })
    }
}

fn probability_of(probs: &[(WeatherKind, u8)], kind: WeatherKind) -> u8 {
    probs
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(0, |(_, p)| *p)
}

/// Map a single forecast day onto per-kind probabilities
fn forecast_probabilities(row: &DailyRow) -> Vec<(WeatherKind, u8)> {
    let cloud = row.cloud_cover_mean.unwrap_or(0.0).clamp(0.0, 100.0);
    let rain = row
        .precipitation_probability_max
        .unwrap_or_else(|| {
            if row.precipitation_sum.unwrap_or(0.0) > WET_DAY_MM {
                70.0
            } else {
                0.0
            }
        })
        .clamp(0.0, 100.0);
    let snow = (row.snowfall_sum.unwrap_or(0.0) * 25.0).clamp(0.0, 100.0);
    let storm = match row.weather_code.unwrap_or(0) {
        code if code >= STORM_WEATHER_CODE => 85.0,
        80..=82 => 40.0,
        61..=67 => 25.0,
        _ => 5.0,
    };
    let wind = (row.wind_speed_max.unwrap_or(0.0) / WIND_SCALE_MPH * 100.0).clamp(0.0, 100.0);

    vec![
        (WeatherKind::Rain, rain as u8),
        (WeatherKind::Snow, snow as u8),
        (WeatherKind::Storm, storm as u8),
        (WeatherKind::Clear, (100.0 - cloud) as u8),
        (WeatherKind::Cloudy, cloud as u8),
        (WeatherKind::Wind, wind as u8),
    ]
}

/// Exceedance share over the sampled years for each kind
fn archive_probabilities(rows: &[DailyRow]) -> Vec<(WeatherKind, u8)> {
    let total = rows.len().max(1) as f32;
    let share = |matching: usize| ((matching as f32 / total) * 100.0).round() as u8;

    let wet = rows
        .iter()
        .filter(|row| row.precipitation_sum.unwrap_or(0.0) > WET_DAY_MM)
        .count();
    let snowy = rows
        .iter()
        .filter(|row| row.snowfall_sum.unwrap_or(0.0) > SNOW_DAY_CM)
        .count();
    let stormy = rows
        .iter()
        .filter(|row| row.weather_code.unwrap_or(0) >= STORM_WEATHER_CODE)
        .count();
    let clear = rows
        .iter()
        .filter(|row| {
            row.cloud_cover_mean.unwrap_or(100.0) < CLEAR_DAY_PCT
                && row.precipitation_sum.unwrap_or(0.0) <= WET_DAY_MM
        })
        .count();
    let cloudy = rows
        .iter()
        .filter(|row| row.cloud_cover_mean.unwrap_or(0.0) > CLOUDY_DAY_PCT)
        .count();
    let windy = rows
        .iter()
        .filter(|row| row.wind_speed_max.unwrap_or(0.0) > WINDY_DAY_MPH)
        .count();

    vec![
        (WeatherKind::Rain, share(wet)),
        (WeatherKind::Snow, share(snowy)),
        (WeatherKind::Storm, share(stormy)),
        (WeatherKind::Clear, share(clear)),
        (WeatherKind::Cloudy, share(cloudy)),
        (WeatherKind::Wind, share(windy)),
    ]
}

/// Same month/day in another year, with Feb 29 falling back to Feb 28
fn same_date_in_year(date: NaiveDate, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 2, 28))
        .unwrap_or(date)
}

/// Daily response from Open-Meteo (forecast and archive endpoints share the shape)
#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: Option<DailyData>,
}

/// Daily column arrays from Open-Meteo
#[derive(Debug, Deserialize)]
struct DailyData {
    time: Vec<String>,
    temperature_2m_max: Option<Vec<Option<f32>>>,
    precipitation_probability_max: Option<Vec<Option<f32>>>,
    precipitation_sum: Option<Vec<Option<f32>>>,
    snowfall_sum: Option<Vec<Option<f32>>>,
    wind_speed_10m_max: Option<Vec<Option<f32>>>,
    cloud_cover_mean: Option<Vec<Option<f32>>>,
    weather_code: Option<Vec<Option<u8>>>,
}

/// One day extracted from the column arrays
#[derive(Debug, Clone, PartialEq)]
struct DailyRow {
    temperature_max: Option<f32>,
    precipitation_probability_max: Option<f32>,
    precipitation_sum: Option<f32>,
    snowfall_sum: Option<f32>,
    wind_speed_max: Option<f32>,
    cloud_cover_mean: Option<f32>,
    weather_code: Option<u8>,
}

impl DailyResponse {
    fn row_for(&self, date: NaiveDate) -> Option<DailyRow> {
        let daily = self.daily.as_ref()?;
        let target = date.format("%Y-%m-%d").to_string();
        let index = daily.time.iter().position(|t| *t == target)?;
        Some(daily.row(index))
    }

    fn rows_for_calendar_date(&self, month: u32, day: u32) -> Vec<DailyRow> {
        let Some(daily) = self.daily.as_ref() else {
            return Vec::new();
        };
        let suffix = format!("-{month:02}-{day:02}");
        daily
            .time
            .iter()
            .enumerate()
            .filter(|(_, t)| t.ends_with(&suffix))
            .map(|(i, _)| daily.row(i))
            .collect()
    }
}

impl DailyData {
    fn row(&self, index: usize) -> DailyRow {
        fn pick<T: Copy>(column: &Option<Vec<Option<T>>>, index: usize) -> Option<T> {
            column.as_ref().and_then(|v| v.get(index).copied().flatten())
        }

        DailyRow {
            temperature_max: pick(&self.temperature_2m_max, index),
            precipitation_probability_max: pick(&self.precipitation_probability_max, index),
            precipitation_sum: pick(&self.precipitation_sum, index),
            snowfall_sum: pick(&self.snowfall_sum, index),
            wind_speed_max: pick(&self.wind_speed_10m_max, index),
            cloud_cover_mean: pick(&self.cloud_cover_mean, index),
            weather_code: pick(&self.weather_code, index),
        }
    }
}
