//! Percentiles of samples by linear interpolation between closest ranks.
//!
//! The `p`-th percentile of `n` ascending values sits at fractional rank
//! `p / 100 * (n - 1)`, so the 50th percentile of an even-sized sample is the
//! midpoint of its two middle values.

/// Percentile `percentile` (0 to 100) of ascending `sorted_values`.
///
/// Returns `None` for an empty slice or a percentile outside `[0, 100]`.
///
/// # Examples
///
/// ```
/// use attrition_stats::percentiles::compute_percentile;
///
/// let tenure = [2.0, 4.0, 6.0, 10.0];
/// assert_eq!(compute_percentile(&tenure, 50.0), Some(5.0));
/// assert_eq!(compute_percentile(&tenure, 100.0), Some(10.0));
/// assert_eq!(compute_percentile(&[], 50.0), None);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_percentile(sorted_values: &[f64], percentile: f64) -> Option<f64> {
    if sorted_values.is_empty() || !(0.0..=100.0).contains(&percentile) {
        return None;
    }
    let rank = percentile / 100.0 * (sorted_values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - rank.floor();
    Some(sorted_values[lower] + fraction * (sorted_values[upper] - sorted_values[lower]))
}

/// 25th, 50th and 75th percentiles of unsorted values.
#[must_use]
pub fn quartiles(values: &[f64]) -> Option<[f64; 3]> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some([
        compute_percentile(&sorted, 25.0)?,
        compute_percentile(&sorted, 50.0)?,
        compute_percentile(&sorted, 75.0)?,
    ])
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_interpolates_between_ranks() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(compute_percentile(&values, 0.0), Some(10.0));
        assert_eq!(compute_percentile(&values, 50.0), Some(30.0));
        assert_abs_diff_eq!(compute_percentile(&values, 2.5).unwrap(), 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(compute_percentile(&values, 97.5).unwrap(), 49.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_value_and_bad_input() {
        assert_eq!(compute_percentile(&[7.0], 95.0), Some(7.0));
        assert_eq!(compute_percentile(&[1.0, 2.0], -1.0), None);
        assert_eq!(compute_percentile(&[1.0, 2.0], 100.5), None);
        assert_eq!(compute_percentile(&[1.0, 2.0], f64::NAN), None);
    }

    #[test]
    fn test_quartiles_of_unsorted_ages() {
        let ages = [80.0, 10.0, 50.0, 30.0, 70.0, 20.0, 60.0, 40.0];
        assert_eq!(quartiles(&ages), Some([27.5, 45.0, 62.5]));
        assert_eq!(quartiles(&[]), None);
    }
}
