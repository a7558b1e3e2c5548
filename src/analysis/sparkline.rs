//! Compact trend sparkline generation

use crate::models::SparklinePoint;

/// Map a history window plus the current probability to sparkline points
///
/// Samples are the history values followed by `current`; `x` is evenly spaced
/// over [0, 100] and `y = 100 - value` for top-down rendering. Idempotent:
/// identical inputs always produce the identical sequence, so re-renders are
/// safe. An empty history yields a single point for `current` at `x = 0`
/// rather than failing.
#[must_use]
pub fn sparkline(history: &[u8], current: u8) -> Vec<SparklinePoint> {
    let samples = history.iter().copied().chain(std::iter::once(current));
    let count = history.len() + 1;

    samples
        .enumerate()
        .map(|(i, value)| {
            let x = if count == 1 {
                0.0
            } else {
                i as f64 / (count - 1) as f64 * 100.0
            };
            SparklinePoint {
                x,
                y: 100.0 - f64::from(value.min(100)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_is_history_plus_one() {
        let points = sparkline(&[45, 52, 48, 61, 55, 67], 73);
        assert_eq!(points.len(), 7);
    }

    #[test]
    fn test_empty_history_yields_single_point() {
        let points = sparkline(&[], 73);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].x, 0.0);
        assert_eq!(points[0].y, 27.0);
    }

    #[test]
    fn test_x_spacing_and_y_inversion() {
        let points = sparkline(&[0, 50], 100);
        assert_eq!(points[0], SparklinePoint { x: 0.0, y: 100.0 });
        assert_eq!(points[1], SparklinePoint { x: 50.0, y: 50.0 });
        assert_eq!(points[2], SparklinePoint { x: 100.0, y: 0.0 });
    }

    #[test]
    fn test_idempotent() {
        let history = [45, 52, 48, 61, 55, 67];
        assert_eq!(sparkline(&history, 73), sparkline(&history, 73));
    }

    #[test]
    fn test_domain_is_monotonic() {
        let points = sparkline(&[10, 20, 30, 40], 50);
        for pair in points.windows(2) {
            assert!(pair[1].x > pair[0].x);
        }
    }
}
