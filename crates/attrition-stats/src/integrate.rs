//! Numerical integration over sampled curves.
//!
//! Curves are given as `(time, value)` points with strictly increasing time,
//! the shape produced by time-dependent metrics such as the Brier score or by
//! survival functions evaluated on a grid.

/// Error returned when a sampled curve cannot be integrated.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum IntegrationError {
    #[display("at least 2 points are required for trapezoidal integration, got {count}")]
    TooFewPoints { count: usize },
    #[display("time must be strictly increasing, but point {index} has time {current} after {previous}")]
    NonIncreasingTime {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[display("point {index} is not finite (time {time}, value {value})")]
    NonFinite { index: usize, time: f64, value: f64 },
    #[display("cannot normalize by non-positive final time {horizon}")]
    NonPositiveHorizon { horizon: f64 },
}

/// Computes the composite trapezoidal integral of a sampled curve.
///
/// Returns `sum((t[i+1] - t[i]) * (v[i] + v[i+1]) / 2)` over consecutive points.
///
/// # Errors
///
/// Fails with [`IntegrationError::TooFewPoints`] for fewer than 2 points, with
/// [`IntegrationError::NonIncreasingTime`] when a time delta is not positive, and
/// with [`IntegrationError::NonFinite`] when a time or value is NaN or infinite.
///
/// # Examples
///
/// ```
/// use attrition_stats::integrate::trapezoid;
///
/// let area = trapezoid(&[(0.0, 0.0), (1.0, 0.2), (2.0, 0.4)]).unwrap();
/// assert!((area - 0.4).abs() < 1e-12);
/// ```
pub fn trapezoid(points: &[(f64, f64)]) -> Result<f64, IntegrationError> {
    if points.len() < 2 {
        return Err(IntegrationError::TooFewPoints {
            count: points.len(),
        });
    }
    if let Some((index, &(time, value))) = points
        .iter()
        .enumerate()
        .find(|(_, (t, v))| !t.is_finite() || !v.is_finite())
    {
        return Err(IntegrationError::NonFinite { index, time, value });
    }

    let mut area = 0.0;
    for (i, pair) in points.windows(2).enumerate() {
        let (t0, v0) = pair[0];
        let (t1, v1) = pair[1];
        let dt = t1 - t0;
        if dt <= 0.0 {
            return Err(IntegrationError::NonIncreasingTime {
                index: i + 1,
                previous: t0,
                current: t1,
            });
        }
        area += dt * (v0 + v1) / 2.0;
    }
    Ok(area)
}

/// Computes the trapezoidal integral divided by the final (maximum) time.
///
/// For a curve starting near time zero this is the time-averaged value of the
/// curve. Applied to a Brier score curve it yields the Integrated Brier Score.
///
/// # Errors
///
/// Same conditions as [`trapezoid`], plus
/// [`IntegrationError::NonPositiveHorizon`] if the final time is not positive.
///
/// # Examples
///
/// ```
/// use attrition_stats::integrate::time_normalized_trapezoid;
///
/// let average = time_normalized_trapezoid(&[(0.0, 0.0), (1.0, 0.2), (2.0, 0.4)]).unwrap();
/// assert!((average - 0.2).abs() < 1e-12);
/// ```
pub fn time_normalized_trapezoid(points: &[(f64, f64)]) -> Result<f64, IntegrationError> {
    let area = trapezoid(points)?;
    let horizon = points.last().map_or(0.0, |&(t, _)| t);
    if horizon <= 0.0 {
        return Err(IntegrationError::NonPositiveHorizon { horizon });
    }
    Ok(area / horizon)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_hand_computed_example() {
        let points = [(0.0, 0.0), (1.0, 0.2), (2.0, 0.4)];
        assert_abs_diff_eq!(trapezoid(&points).unwrap(), 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(
            time_normalized_trapezoid(&points).unwrap(),
            0.2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_constant_curve() {
        let c = 0.17;
        let points = [(0.0, c), (0.5, c), (3.0, c), (7.25, c), (10.0, c)];
        assert_abs_diff_eq!(trapezoid(&points).unwrap(), c * 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            time_normalized_trapezoid(&points).unwrap(),
            c,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_time_scaling() {
        let points = [(1.0, 0.1), (2.0, 0.3), (4.0, 0.2), (5.0, 0.25)];
        let k = 3.5;
        let scaled = points.map(|(t, v)| (t * k, v));

        let raw = trapezoid(&points).unwrap();
        let raw_scaled = trapezoid(&scaled).unwrap();
        assert_abs_diff_eq!(raw_scaled, raw * k, epsilon = 1e-12);

        assert_abs_diff_eq!(
            time_normalized_trapezoid(&scaled).unwrap(),
            time_normalized_trapezoid(&points).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_time_translation_keeps_area() {
        let points = [(1.0, 0.1), (2.0, 0.3), (4.0, 0.2)];
        let shifted = points.map(|(t, v)| (t + 10.0, v));
        let raw = trapezoid(&points).unwrap();
        assert_abs_diff_eq!(trapezoid(&shifted).unwrap(), raw, epsilon = 1e-12);
        assert_abs_diff_eq!(
            time_normalized_trapezoid(&shifted).unwrap(),
            raw / 14.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_single_point_fails() {
        assert_eq!(
            trapezoid(&[(1.0, 0.2)]),
            Err(IntegrationError::TooFewPoints { count: 1 })
        );
        assert_eq!(
            time_normalized_trapezoid(&[]),
            Err(IntegrationError::TooFewPoints { count: 0 })
        );
    }

    #[test]
    fn test_non_increasing_time_fails() {
        let err = trapezoid(&[(0.0, 0.1), (2.0, 0.2), (2.0, 0.3)]).unwrap_err();
        assert_eq!(
            err,
            IntegrationError::NonIncreasingTime {
                index: 2,
                previous: 2.0,
                current: 2.0
            }
        );
        assert!(trapezoid(&[(3.0, 0.1), (1.0, 0.2)]).is_err());
    }

    #[test]
    fn test_non_finite_fails() {
        let err = trapezoid(&[(0.0, 0.1), (1.0, f64::NAN)]).unwrap_err();
        assert!(matches!(err, IntegrationError::NonFinite { index: 1, .. }));
    }

    #[test]
    fn test_non_positive_horizon_fails() {
        let err = time_normalized_trapezoid(&[(-2.0, 0.1), (0.0, 0.1)]).unwrap_err();
        assert_eq!(err, IntegrationError::NonPositiveHorizon { horizon: 0.0 });
    }
}
