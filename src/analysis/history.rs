//! Deterministic history window synthesis
//!
//! The dashboard renders a short "7-day trend" per metric card. External
//! providers do not serve that window directly, so it is synthesized as the
//! current probability perturbed by bounded jitter from an RNG seeded by a
//! stable fold of (rounded coordinates, date ordinal, kind). The same query
//! therefore re-derives the same history across runs and processes, which
//! keeps trend classification and sparklines reproducible.

use crate::models::{Location, WeatherKind};
use chrono::{Datelike, NaiveDate};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Tunable parameters for history synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryParams {
    /// Number of prior samples in the window
    pub window: usize,
    /// Maximum absolute perturbation, in probability points
    pub jitter: u8,
}

impl Default for HistoryParams {
    fn default() -> Self {
        Self {
            window: 6,
            jitter: 15,
        }
    }
}

/// Derive a stable history window for one metric
///
/// Every value is clamped to [0, 100]; output length is exactly
/// `params.window`.
#[must_use]
pub fn derive_history(
    location: &Location,
    date: NaiveDate,
    kind: WeatherKind,
    current: u8,
    params: &HistoryParams,
) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(history_seed(location, date, kind));
    let jitter = i16::from(params.jitter);

    (0..params.window)
        .map(|_| {
            let perturbed = i16::from(current) + rng.random_range(-jitter..=jitter);
            perturbed.clamp(0, 100) as u8
        })
        .collect()
}

/// Stable FNV-1a style fold of the inputs that identify a history window
///
/// Coordinates are rounded to two decimals so nearby map clicks reuse the
/// same window.
fn history_seed(location: &Location, date: NaiveDate, kind: WeatherKind) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let (lat, lon) = location.rounded_coordinates(2);
    let words = [
        (lat * 100.0).round() as i64 as u64,
        (lon * 100.0).round() as i64 as u64,
        u64::from(date.num_days_from_ce().unsigned_abs()),
        kind.index(),
    ];

    let mut seed = FNV_OFFSET;
    for word in words {
        for byte in word.to_le_bytes() {
            seed ^= u64::from(byte);
            seed = seed.wrapping_mul(FNV_PRIME);
        }
    }
    seed
}
