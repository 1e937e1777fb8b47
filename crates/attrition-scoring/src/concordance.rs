//! Harrell's concordance index.

use std::cmp::Ordering;

use attrition_data::record::SurvivalRecord;
use attrition_models::SurvivalPredictor;
use attrition_stats::integrate::{IntegrationError, trapezoid};

use crate::brier::{ScoreError, validate_times};

/// Error returned when the concordance index is undefined.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConcordanceError {
    #[display("{observations} observations but {risks} risk scores")]
    LengthMismatch { observations: usize, risks: usize },
    #[display("no comparable pairs: at least one event must precede another observation")]
    NoComparablePairs,
}

/// Fraction of comparable pairs whose risk scores are ordered like their
/// outcomes.
///
/// A pair is comparable when the subject with the shorter time had the event
/// (or both share a time and only the first had it). It is concordant when
/// that subject has the higher risk; tied risks count half.
///
/// # Examples
///
/// ```
/// use attrition_scoring::concordance::concordance_index;
///
/// let observations = [(1.0, true), (2.0, true), (3.0, false)];
/// assert_eq!(concordance_index(&observations, &[3.0, 2.0, 1.0]).unwrap(), 1.0);
/// assert_eq!(concordance_index(&observations, &[1.0, 2.0, 3.0]).unwrap(), 0.0);
/// ```
#[expect(clippy::cast_precision_loss)]
pub fn concordance_index(
    observations: &[(f64, bool)],
    risks: &[f64],
) -> Result<f64, ConcordanceError> {
    if observations.len() != risks.len() {
        return Err(ConcordanceError::LengthMismatch {
            observations: observations.len(),
            risks: risks.len(),
        });
    }

    let mut concordant = 0.0;
    let mut comparable = 0usize;
    for (i, &(ti, di)) in observations.iter().enumerate() {
        if !di {
            continue;
        }
        for (j, &(tj, dj)) in observations.iter().enumerate() {
            let ordered = match ti.total_cmp(&tj) {
                Ordering::Less => true,
                Ordering::Equal => !dj,
                Ordering::Greater => false,
            };
            if i == j || !ordered {
                continue;
            }
            comparable += 1;
            concordant += match risks[i].partial_cmp(&risks[j]) {
                Some(Ordering::Greater) => 1.0,
                Some(Ordering::Equal) => 0.5,
                _ => 0.0,
            };
        }
    }

    if comparable == 0 {
        return Err(ConcordanceError::NoComparablePairs);
    }
    Ok(concordant / comparable as f64)
}

/// Risk scores for concordance: the negative restricted mean survival time
/// over `times`, so that subjects expected to leave sooner score higher.
///
/// The survival curve starts at `(0, 1)` and is integrated with the
/// trapezoidal rule up to the last evaluation time.
pub fn risk_scores<M>(
    model: &M,
    records: &[SurvivalRecord],
    times: &[f64],
) -> Result<Vec<f64>, RiskScoreError>
where
    M: SurvivalPredictor + ?Sized,
{
    validate_times(times).map_err(RiskScoreError::Score)?;
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let survival = model
                .predict_survival(&record.covariates, times)
                .map_err(|source| RiskScoreError::Score(ScoreError::Predict { index, source }))?;
            let mut curve = Vec::with_capacity(times.len() + 1);
            if times[0] > 0.0 {
                curve.push((0.0, 1.0));
            }
            curve.extend(times.iter().copied().zip(survival));
            Ok(-trapezoid(&curve).map_err(RiskScoreError::Integration)?)
        })
        .collect()
}

/// Error returned when risk scores cannot be derived from a model.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum RiskScoreError {
    #[display("{_0}")]
    Score(#[error(source)] ScoreError),
    #[display("failed to integrate survival curve: {_0}")]
    Integration(#[error(source)] IntegrationError),
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use attrition_data::record::{CovariateValue, Covariates};
    use attrition_models::{PredictError, TimeSupport};

    use super::*;

    #[test]
    fn test_perfect_and_reversed() {
        let observations = [(1.0, true), (2.0, true), (3.0, true), (4.0, false)];
        assert_eq!(
            concordance_index(&observations, &[4.0, 3.0, 2.0, 1.0]),
            Ok(1.0)
        );
        assert_eq!(
            concordance_index(&observations, &[1.0, 2.0, 3.0, 4.0]),
            Ok(0.0)
        );
        assert_eq!(
            concordance_index(&observations, &[1.0, 1.0, 1.0, 1.0]),
            Ok(0.5)
        );
    }

    #[test]
    fn test_censored_pairs_not_comparable() {
        // (2, censored) vs (3, event) cannot be ordered.
        let observations = [(2.0, false), (3.0, true), (5.0, true)];
        // Only pair (3, 5) is comparable, and it is concordant.
        assert_eq!(concordance_index(&observations, &[0.0, 2.0, 1.0]), Ok(1.0));
    }

    #[test]
    fn test_tied_time_event_before_censoring() {
        let observations = [(2.0, true), (2.0, false)];
        assert_eq!(concordance_index(&observations, &[1.0, 0.0]), Ok(1.0));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            concordance_index(&[(1.0, true)], &[]),
            Err(ConcordanceError::LengthMismatch {
                observations: 1,
                risks: 0
            })
        );
        assert_eq!(
            concordance_index(&[(1.0, false), (2.0, false)], &[0.0, 1.0]),
            Err(ConcordanceError::NoComparablePairs)
        );
    }

    /// Exponential survival with a per-subject rate.
    struct Exponential;

    impl SurvivalPredictor for Exponential {
        fn support(&self) -> TimeSupport {
            TimeSupport {
                min_time: 0.0,
                max_time: 10.0,
            }
        }

        fn predict_survival(
            &self,
            covariates: &Covariates,
            times: &[f64],
        ) -> Result<Vec<f64>, PredictError> {
            let rate = covariates
                .get("rate")
                .and_then(CovariateValue::as_numeric)
                .unwrap_or(1.0);
            Ok(times.iter().map(|t| (-rate * t).exp()).collect())
        }
    }

    #[test]
    fn test_risk_scores_follow_hazard() {
        let records = [0.1, 0.5, 0.2]
            .into_iter()
            .map(|rate| SurvivalRecord {
                duration: 1.0,
                event: true,
                covariates: Covariates::from([("rate", CovariateValue::Numeric(rate))]),
            })
            .collect::<Vec<_>>();
        let risks = risk_scores(&Exponential, &records, &[1.0, 2.0, 3.0]).unwrap();
        assert!(risks[1] > risks[2]);
        assert!(risks[2] > risks[0]);
        // Restricted mean is at most the horizon.
        assert!(risks.iter().all(|&r| r >= -3.0 && r < 0.0));

        let flat = risk_scores(&Exponential, &records[..1], &[0.0, 2.0]).unwrap();
        assert_abs_diff_eq!(flat[0], -(1.0 + (-0.2_f64).exp()), epsilon = 1e-12);
    }
}
