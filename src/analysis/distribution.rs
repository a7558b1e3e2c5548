//! Probability distribution curve synthesis

use crate::models::DistributionPoint;

/// Tunable parameters for the distribution synthesizer
///
/// The blend weight and width divisor shape how strongly the curve leans on
/// the average baseline and how wide the central bump spreads. The defaults
/// reproduce the dashboard's original curve; neither value is derived from
/// data, so both stay configurable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionParams {
    /// Number of intervals across the horizon; output has `horizon + 1` samples
    pub horizon: usize,
    /// Weight of the average probability blended into every sample
    pub average_weight: f64,
    /// The bump width is `horizon / width_divisor`
    pub width_divisor: f64,
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self {
            horizon: 30,
            average_weight: 0.3,
            width_divisor: 6.0,
        }
    }
}

/// Synthesize a bounded bell-shaped distribution curve
///
/// Models a single Gaussian bump of height `peak` centered at the horizon
/// midpoint on top of an `average`-proportional baseline:
/// `value(i) = clamp(exp(-0.5 * n^2) * peak + average * average_weight, 0, 100)`
/// with `n = (i - center) / width`. Positions span [0, 100] linearly and
/// strictly increase; output length is always `horizon + 1` regardless of
/// input, so `horizon = 0` degenerates to a single full-peak sample at
/// position 0. A parametric curve keeps the render replayable without storing
/// the full historical series.
#[must_use]
pub fn synthesize(peak: u8, average: u8, params: &DistributionParams) -> Vec<DistributionPoint> {
    let horizon = params.horizon;
    let center = horizon as f64 / 2.0;
    let width = (horizon as f64 / params.width_divisor).max(f64::EPSILON);

    (0..=horizon)
        .map(|i| {
            let normalized = (i as f64 - center) / width;
            let bump = (-0.5 * normalized * normalized).exp();
            let value =
                (bump * f64::from(peak) + f64::from(average) * params.average_weight).clamp(0.0, 100.0);
            let position = if horizon == 0 {
                0.0
            } else {
                i as f64 / horizon as f64 * 100.0
            };
            DistributionPoint { position, value }
        })
        .collect()
}
