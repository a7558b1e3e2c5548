//! Severity tier and trend classification

use crate::models::Trend;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of prior history samples compared against the current value
pub const DEFAULT_TREND_WINDOW: usize = 3;

/// Default dead band, in probability points, inside which a trend is stable
pub const DEFAULT_TREND_EPSILON: f64 = 2.0;

/// Severity tier for a probability value
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Low,
    Moderate,
    Elevated,
    High,
}

impl SeverityTier {
    /// Display label for this tier
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SeverityTier::Low => "Low",
            SeverityTier::Moderate => "Moderate",
            SeverityTier::Elevated => "Elevated",
            SeverityTier::High => "High",
        }
    }

    /// Color token used by the cards (matches the dashboard palette)
    #[must_use]
    pub fn color_token(self) -> &'static str {
        match self {
            SeverityTier::Low => "green",
            SeverityTier::Moderate => "blue",
            SeverityTier::Elevated => "yellow",
            SeverityTier::High => "red",
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classify a probability into a severity tier
///
/// The four tiers partition [0, 100] with fixed breakpoints: `<30` low,
/// `[30, 50)` moderate, `[50, 70)` elevated, `>=70` high.
#[must_use]
pub fn classify(probability: u8) -> SeverityTier {
    match probability {
        0..=29 => SeverityTier::Low,
        30..=49 => SeverityTier::Moderate,
        50..=69 => SeverityTier::Elevated,
        _ => SeverityTier::High,
    }
}

/// Classify the trend of `current` against the tail of `history`
///
/// Compares `current` to the mean of the last `window` prior values (fewer if
/// the history is shorter). Beyond `epsilon` points above the mean is `Up`,
/// beyond `epsilon` below is `Down`, otherwise `Stable`. An empty history is
/// always `Stable`.
#[must_use]
pub fn trend_of(history: &[u8], current: u8, window: usize, epsilon: f64) -> Trend {
    if history.is_empty() || window == 0 {
        return Trend::Stable;
    }

    let tail_len = window.min(history.len());
    let tail = &history[history.len() - tail_len..];
    let mean = tail.iter().map(|&v| f64::from(v)).sum::<f64>() / tail_len as f64;

    let delta = f64::from(current) - mean;
    if delta > epsilon {
        Trend::Up
    } else if delta < -epsilon {
        Trend::Down
    } else {
        Trend::Stable
    }
}
