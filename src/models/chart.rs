//! Point types for the distribution curve and sparklines

use serde::{Deserialize, Serialize};

/// One sample of the probability distribution curve
///
/// `position` is time-normalized over [0, 100]; `value` is the probability
/// axis, also [0, 100]. The chart-space `y = 100 - value` inversion is a
/// rendering concern and stays out of this type.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct DistributionPoint {
    pub position: f64,
    pub value: f64,
}

/// One sample of a compact trend sparkline, already in chart space
///
/// Both axes are normalized to [0, 100]; `y` uses the inverted top-down
/// convention (`y = 100 - value`).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SparklinePoint {
    pub x: f64,
    pub y: f64,
}
