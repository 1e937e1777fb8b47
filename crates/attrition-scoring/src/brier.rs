//! Time-dependent Brier score under right censoring.
//!
//! For each evaluation time `t` the score is the inverse probability of
//! censoring weighted mean squared error of the predicted survival:
//!
//! ```text
//! BS(t) = 1/n * sum_i [ 1{T_i <= t, d_i = 1} * S_i(t)^2       / G(T_i-)
//!                     + 1{T_i > t}           * (1 - S_i(t))^2 / G(t) ]
//! ```
//!
//! where `G` is the Kaplan-Meier estimate of the censoring distribution on
//! the test set. Subjects censored before `t` contribute nothing, as does any
//! term whose weight denominator is zero.

use attrition_data::record::SurvivalRecord;
use attrition_models::{PredictError, SurvivalPredictor};
use attrition_stats::{percentiles::compute_percentile, survival::KaplanMeierCurve};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    interval::BrierEstimate,
    table::{ScoreRow, ScoreTable},
};

/// Bootstrap settings for the confidence intervals of a score table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreOptions {
    /// Number of bootstrap resamples. Zero collapses every interval to its
    /// point estimate.
    pub bootstrap_samples: usize,
    /// Two-sided confidence level, strictly between 0 and 1.
    pub confidence_level: f64,
    pub seed: u64,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            bootstrap_samples: 200,
            confidence_level: 0.95,
            seed: 42,
        }
    }
}

/// Error returned when a score table cannot be computed.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ScoreError {
    #[display("test set is empty")]
    EmptyTestSet,
    #[display("no evaluation times given")]
    NoEvaluationTimes,
    #[display("evaluation time {time} at index {index} is not a non-negative finite number")]
    InvalidTime { index: usize, time: f64 },
    #[display("evaluation times must be strictly increasing, but index {index} has {current} after {previous}")]
    NonIncreasingTimes {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[display("evaluation time {time} is beyond the model's training support (max {max_time})")]
    BeyondSupport { time: f64, max_time: f64 },
    #[display("confidence level must be strictly between 0 and 1, got {level}")]
    InvalidConfidenceLevel { level: f64 },
    #[display("prediction failed for test subject {index}: {source}")]
    Predict { index: usize, source: PredictError },
}

/// Sorted distinct durations of the test set, the default evaluation grid.
#[must_use]
pub fn evaluation_times(test: &[SurvivalRecord]) -> Vec<f64> {
    let mut times = test.iter().map(|r| r.duration).collect::<Vec<_>>();
    times.sort_by(f64::total_cmp);
    times.dedup();
    times
}

/// Checks that `times` is a non-empty, finite, non-negative, strictly
/// increasing grid.
pub(crate) fn validate_times(times: &[f64]) -> Result<(), ScoreError> {
    if times.is_empty() {
        return Err(ScoreError::NoEvaluationTimes);
    }
    if let Some((index, &time)) = times
        .iter()
        .enumerate()
        .find(|(_, t)| !t.is_finite() || **t < 0.0)
    {
        return Err(ScoreError::InvalidTime { index, time });
    }
    if let Some(index) = times.windows(2).position(|w| w[1] <= w[0]) {
        return Err(ScoreError::NonIncreasingTimes {
            index: index + 1,
            previous: times[index],
            current: times[index + 1],
        });
    }
    Ok(())
}

/// Scores a model on a held-out test set at each evaluation time.
///
/// Returns one row per time with the Brier point estimate and a percentile
/// bootstrap confidence interval. Resampling is over test subjects with the
/// censoring distribution held fixed, driven by `options.seed`.
pub fn score<M>(
    model: &M,
    test: &[SurvivalRecord],
    times: &[f64],
    options: &ScoreOptions,
) -> Result<ScoreTable, ScoreError>
where
    M: SurvivalPredictor + ?Sized,
{
    if test.is_empty() {
        return Err(ScoreError::EmptyTestSet);
    }
    validate_times(times)?;
    let max_time = model.support().max_time;
    if let Some(&time) = times.iter().find(|&&t| t > max_time) {
        return Err(ScoreError::BeyondSupport { time, max_time });
    }
    let level = options.confidence_level;
    if !(level > 0.0 && level < 1.0) {
        return Err(ScoreError::InvalidConfidenceLevel { level });
    }

    let contributions = weighted_contributions(model, test, times)?;
    let points = column_means(&contributions, 0..test.len());
    let bounds = bootstrap_bounds(&contributions, options);

    let rows = times
        .iter()
        .zip(points)
        .enumerate()
        .map(|(j, (&time, point))| {
            let brier = match &bounds {
                Some(bounds) => BrierEstimate {
                    point,
                    low: bounds[j].0.min(point),
                    high: bounds[j].1.max(point),
                },
                None => BrierEstimate::exact(point),
            };
            ScoreRow { time, brier }
        })
        .collect();

    log::debug!(
        "Scored {} test subjects at {} evaluation times ({} bootstrap resamples)",
        test.len(),
        times.len(),
        options.bootstrap_samples
    );
    Ok(ScoreTable::from_checked_rows(rows))
}

/// Per-subject IPCW terms, indexed `[subject][time]`.
fn weighted_contributions<M>(
    model: &M,
    test: &[SurvivalRecord],
    times: &[f64],
) -> Result<Vec<Vec<f64>>, ScoreError>
where
    M: SurvivalPredictor + ?Sized,
{
    let observations = test
        .iter()
        .map(SurvivalRecord::observation)
        .collect::<Vec<_>>();
    let censoring = KaplanMeierCurve::censoring_distribution(&observations);
    let weight_at = times
        .iter()
        .map(|&t| inverse(censoring.survival_at(t)))
        .collect::<Vec<_>>();

    test.iter()
        .enumerate()
        .map(|(index, record)| {
            let survival = model
                .predict_survival(&record.covariates, times)
                .map_err(|source| ScoreError::Predict { index, source })?;
            let (duration, event) = record.observation();
            let weight_at_event = inverse(censoring.survival_before(duration));
            let terms = times
                .iter()
                .zip(&survival)
                .zip(&weight_at)
                .map(|((&t, &s), &w)| {
                    if duration <= t && event {
                        s * s * weight_at_event
                    } else if duration > t {
                        (1.0 - s) * (1.0 - s) * w
                    } else {
                        0.0
                    }
                })
                .collect();
            Ok(terms)
        })
        .collect()
}

fn inverse(probability: f64) -> f64 {
    if probability > 0.0 {
        1.0 / probability
    } else {
        0.0
    }
}

#[expect(clippy::cast_precision_loss)]
fn column_means<I>(contributions: &[Vec<f64>], subjects: I) -> Vec<f64>
where
    I: IntoIterator<Item = usize>,
{
    let width = contributions.first().map_or(0, Vec::len);
    let mut sums = vec![0.0; width];
    let mut count = 0usize;
    for i in subjects {
        for (sum, value) in sums.iter_mut().zip(&contributions[i]) {
            *sum += value;
        }
        count += 1;
    }
    if count > 0 {
        for sum in &mut sums {
            *sum /= count as f64;
        }
    }
    sums
}

/// `(low, high)` percentile bounds per evaluation time, or `None` when no
/// resampling was requested.
fn bootstrap_bounds(
    contributions: &[Vec<f64>],
    options: &ScoreOptions,
) -> Option<Vec<(f64, f64)>> {
    if options.bootstrap_samples == 0 {
        return None;
    }
    let n = contributions.len();
    let width = contributions.first().map_or(0, Vec::len);
    let mut rng = Pcg32::seed_from_u64(options.seed);
    let mut samples = vec![Vec::with_capacity(options.bootstrap_samples); width];
    for _ in 0..options.bootstrap_samples {
        let resample = (0..n).map(|_| rng.random_range(0..n)).collect::<Vec<_>>();
        for (column, mean) in samples.iter_mut().zip(column_means(contributions, resample)) {
            column.push(mean);
        }
    }

    let alpha = (1.0 - options.confidence_level) / 2.0;
    let (low_pct, high_pct) = (alpha * 100.0, (1.0 - alpha) * 100.0);
    samples
        .into_iter()
        .map(|mut column| {
            column.sort_by(f64::total_cmp);
            Some((
                compute_percentile(&column, low_pct)?,
                compute_percentile(&column, high_pct)?,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use attrition_data::record::{CovariateValue, Covariates};
    use attrition_models::TimeSupport;

    use super::*;

    /// Knows each subject's true event time through a `truth` covariate.
    struct Oracle {
        max_time: f64,
    }

    impl SurvivalPredictor for Oracle {
        fn support(&self) -> TimeSupport {
            TimeSupport {
                min_time: 0.0,
                max_time: self.max_time,
            }
        }

        fn predict_survival(
            &self,
            covariates: &Covariates,
            times: &[f64],
        ) -> Result<Vec<f64>, PredictError> {
            let truth = covariates
                .get("truth")
                .and_then(CovariateValue::as_numeric)
                .unwrap_or(f64::INFINITY);
            Ok(times
                .iter()
                .map(|&t| if t < truth { 1.0 } else { 0.0 })
                .collect())
        }
    }

    /// Predicts the same survival probability for everyone.
    struct Constant(f64);

    impl SurvivalPredictor for Constant {
        fn support(&self) -> TimeSupport {
            TimeSupport {
                min_time: 0.0,
                max_time: 100.0,
            }
        }

        fn predict_survival(
            &self,
            _covariates: &Covariates,
            times: &[f64],
        ) -> Result<Vec<f64>, PredictError> {
            Ok(vec![self.0; times.len()])
        }
    }

    fn subject(duration: f64, event: bool) -> SurvivalRecord {
        SurvivalRecord {
            duration,
            event,
            covariates: Covariates::from([("truth", CovariateValue::Numeric(duration))]),
        }
    }

    fn uncensored() -> Vec<SurvivalRecord> {
        [1.0, 2.0, 3.0, 4.0, 5.0]
            .into_iter()
            .map(|d| subject(d, true))
            .collect()
    }

    #[test]
    fn test_perfect_predictor_scores_zero() {
        let test = uncensored();
        let times = evaluation_times(&test);
        let table = score(&Oracle { max_time: 5.0 }, &test, &times, &ScoreOptions::default())
            .unwrap();
        assert_eq!(table.len(), 5);
        for row in table.rows() {
            assert_abs_diff_eq!(row.brier.point, 0.0);
            assert_abs_diff_eq!(row.brier.high, 0.0);
        }
    }

    #[test]
    fn test_coin_flip_scores_quarter() {
        let test = uncensored();
        let table = score(&Constant(0.5), &test, &[1.0, 2.5, 5.0], &ScoreOptions::default())
            .unwrap();
        for row in table.rows() {
            assert_abs_diff_eq!(row.brier.point, 0.25, epsilon = 1e-12);
            assert_abs_diff_eq!(row.brier.low, 0.25, epsilon = 1e-12);
            assert_abs_diff_eq!(row.brier.high, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_censoring_weights() {
        // Censoring KM: G(t) = 1 before 2, 2/3 from 2 on.
        let test = vec![
            subject(1.0, true),
            subject(2.0, false),
            subject(3.0, true),
            subject(4.0, true),
        ];
        let options = ScoreOptions {
            bootstrap_samples: 0,
            ..ScoreOptions::default()
        };
        let table = score(&Constant(0.5), &test, &[1.0, 3.0], &options).unwrap();

        // t = 1: subject 1 had the event (weight 1), three at risk (weight 1).
        assert_abs_diff_eq!(table.rows()[0].brier.point, 0.25, epsilon = 1e-12);
        // t = 3: subject 1 (weight 1), subject 2 censored before (0),
        // subject 3 event at 3 (weight 1/G(3-) = 1.5), subject 4 at risk
        // (weight 1/G(3) = 1.5).
        let expected = 0.25 * (1.0 + 0.0 + 1.5 + 1.5) / 4.0;
        assert_abs_diff_eq!(table.rows()[1].brier.point, expected, epsilon = 1e-12);
        assert_eq!(table.rows()[1].brier, BrierEstimate::exact(expected));
    }

    #[test]
    fn test_censoring_tied_with_event() {
        // The event at 1 leaves the censoring risk set before the censoring
        // at 1, so G(1) = 2/3 and a coin flip still scores exactly 0.25.
        let test = vec![
            subject(1.0, true),
            subject(1.0, false),
            subject(2.0, true),
            subject(3.0, true),
        ];
        let options = ScoreOptions {
            bootstrap_samples: 0,
            ..ScoreOptions::default()
        };
        let table = score(&Constant(0.5), &test, &[1.0, 2.0], &options).unwrap();

        // t = 1: 0.25 (event, weight 1) + 0 (censored) + 2 * 0.25 * 1.5 (at risk)
        assert_abs_diff_eq!(table.rows()[0].brier.point, 0.25, epsilon = 1e-12);
        // t = 2: event at 2 is weighted by 1 / G(2-) = 1.5
        assert_abs_diff_eq!(table.rows()[1].brier.point, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_bootstrap_interval_brackets_point() {
        let test = (0..40)
            .map(|i| subject(f64::from(i % 10 + 1), i % 3 != 0))
            .collect::<Vec<_>>();
        let times = evaluation_times(&test);
        let options = ScoreOptions::default();
        let a = score(&Constant(0.7), &test, &times, &options).unwrap();
        let b = score(&Constant(0.7), &test, &times, &options).unwrap();
        assert_eq!(a, b);
        for row in a.rows() {
            assert!(row.brier.low <= row.brier.point);
            assert!(row.brier.point <= row.brier.high);
        }
        assert!(a.rows().iter().any(|r| r.brier.width() > 0.0));
    }

    #[test]
    fn test_rejects_times_beyond_support() {
        let test = uncensored();
        assert_eq!(
            score(&Oracle { max_time: 4.0 }, &test, &[1.0, 5.0], &ScoreOptions::default()),
            Err(ScoreError::BeyondSupport {
                time: 5.0,
                max_time: 4.0
            })
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        let options = ScoreOptions::default();
        let model = Constant(0.5);
        assert_eq!(
            score(&model, &[], &[1.0], &options),
            Err(ScoreError::EmptyTestSet)
        );
        let test = uncensored();
        assert_eq!(
            score(&model, &test, &[], &options),
            Err(ScoreError::NoEvaluationTimes)
        );
        assert!(matches!(
            score(&model, &test, &[2.0, 1.0], &options),
            Err(ScoreError::NonIncreasingTimes { index: 1, .. })
        ));
        assert!(matches!(
            score(&model, &test, &[1.0, f64::NAN], &options),
            Err(ScoreError::InvalidTime { index: 1, .. })
        ));
        let options = ScoreOptions {
            confidence_level: 1.0,
            ..ScoreOptions::default()
        };
        assert!(matches!(
            score(&model, &test, &[1.0], &options),
            Err(ScoreError::InvalidConfidenceLevel { .. })
        ));
    }

    #[test]
    fn test_evaluation_times_sorted_distinct() {
        let test = vec![subject(3.0, true), subject(1.0, false), subject(3.0, false)];
        assert_eq!(evaluation_times(&test), vec![1.0, 3.0]);
    }
}
