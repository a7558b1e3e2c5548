//! Derived weather-risk metrics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Weather condition a metric describes
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WeatherKind {
    Rain,
    Snow,
    Storm,
    Clear,
    Cloudy,
    Wind,
}

impl WeatherKind {
    /// All kinds, in stable display order
    pub const ALL: [WeatherKind; 6] = [
        WeatherKind::Rain,
        WeatherKind::Snow,
        WeatherKind::Storm,
        WeatherKind::Clear,
        WeatherKind::Cloudy,
        WeatherKind::Wind,
    ];

    /// Stable index, used for deterministic history seeding
    #[must_use]
    pub fn index(self) -> u64 {
        match self {
            WeatherKind::Rain => 0,
            WeatherKind::Snow => 1,
            WeatherKind::Storm => 2,
            WeatherKind::Clear => 3,
            WeatherKind::Cloudy => 4,
            WeatherKind::Wind => 5,
        }
    }

    /// Card title for this kind
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            WeatherKind::Rain => "Rain Probability",
            WeatherKind::Snow => "Snow Probability",
            WeatherKind::Storm => "Storm Risk",
            WeatherKind::Clear => "Clear Skies",
            WeatherKind::Cloudy => "Cloud Cover",
            WeatherKind::Wind => "High Winds",
        }
    }

    /// Card description for this kind
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            WeatherKind::Rain => "Chance of precipitation",
            WeatherKind::Snow => "Chance of snowfall",
            WeatherKind::Storm => "Severe weather likelihood",
            WeatherKind::Clear => "Chance of clear conditions",
            WeatherKind::Cloudy => "Overcast conditions",
            WeatherKind::Wind => "Above threshold wind speed",
        }
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherKind::Rain => write!(f, "rain"),
            WeatherKind::Snow => write!(f, "snow"),
            WeatherKind::Storm => write!(f, "storm"),
            WeatherKind::Clear => write!(f, "clear"),
            WeatherKind::Cloudy => write!(f, "cloudy"),
            WeatherKind::Wind => write!(f, "wind"),
        }
    }
}

/// Direction of a metric relative to its recent history
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// A derived weather-risk metric
///
/// Immutable once derived; a new query run replaces the whole set.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherMetric {
    /// Weather condition this metric describes
    pub kind: WeatherKind,
    /// Probability in percent (0-100)
    pub probability: u8,
    /// Card title
    pub title: String,
    /// Card description
    pub description: String,
    /// Trend relative to the history window
    pub trend: Trend,
    /// Short history window of prior probabilities (0-100 each)
    pub history: Vec<u8>,
}
