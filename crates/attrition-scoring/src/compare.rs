//! Choosing between candidate models by integrated Brier score.

use attrition_models::ModelKind;
use serde::Serialize;

/// Default distance below which two integrated Brier scores count as equal.
pub const DEFAULT_TIE_TOLERANCE: f64 = 1e-6;

/// A candidate model and its integrated Brier score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelScore {
    pub label: String,
    /// Estimator family, when known. Used only to break ties.
    pub kind: Option<ModelKind>,
    pub ibs: f64,
}

impl ModelScore {
    fn tie_rank(&self) -> u8 {
        self.kind.map_or(u8::MAX, ModelKind::interpretability_rank)
    }
}

/// Error returned when no model can be selected.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ComparisonError {
    #[display("no candidate models to compare")]
    NoCandidates,
    #[display("model '{label}' has non-finite integrated Brier score {ibs}")]
    NonFiniteScore { label: String, ibs: f64 },
    #[display("tie tolerance must be a non-negative number, got {tolerance}")]
    InvalidTolerance { tolerance: f64 },
}

/// Returns the candidate with the lowest integrated Brier score.
///
/// Candidates within `tie_tolerance` of the lowest score are tied. Among tied
/// candidates the more interpretable model kind wins (Cox before forest,
/// unknown kinds last), and after that the earliest candidate.
///
/// # Examples
///
/// ```
/// use attrition_models::ModelKind;
/// use attrition_scoring::compare::{DEFAULT_TIE_TOLERANCE, ModelScore, select_best};
///
/// let candidates = [
///     ModelScore { label: "cox".into(), kind: Some(ModelKind::Cox), ibs: 0.18 },
///     ModelScore { label: "forest".into(), kind: Some(ModelKind::Forest), ibs: 0.21 },
/// ];
/// let best = select_best(&candidates, DEFAULT_TIE_TOLERANCE).unwrap();
/// assert_eq!(best.label, "cox");
/// ```
pub fn select_best(
    candidates: &[ModelScore],
    tie_tolerance: f64,
) -> Result<&ModelScore, ComparisonError> {
    if !(tie_tolerance >= 0.0 && tie_tolerance.is_finite()) {
        return Err(ComparisonError::InvalidTolerance {
            tolerance: tie_tolerance,
        });
    }
    if let Some(candidate) = candidates.iter().find(|c| !c.ibs.is_finite()) {
        return Err(ComparisonError::NonFiniteScore {
            label: candidate.label.clone(),
            ibs: candidate.ibs,
        });
    }
    let lowest = candidates
        .iter()
        .map(|c| c.ibs)
        .min_by(f64::total_cmp)
        .ok_or(ComparisonError::NoCandidates)?;

    let best = candidates
        .iter()
        .filter(|c| c.ibs - lowest <= tie_tolerance)
        .min_by_key(|c| c.tie_rank())
        .ok_or(ComparisonError::NoCandidates)?;
    log::debug!(
        "Selected '{}' (IBS {:.6}) out of {} candidates",
        best.label,
        best.ibs,
        candidates.len()
    );
    Ok(best)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use attrition_data::record::{CovariateValue, Covariates, SurvivalRecord};
    use attrition_models::{PredictError, SurvivalPredictor, TimeSupport};

    use super::*;
    use crate::{
        brier::{ScoreOptions, evaluation_times, score},
        ibs::integrated_brier_score,
        table::ScoreTable,
    };

    fn candidate(label: &str, kind: Option<ModelKind>, ibs: f64) -> ModelScore {
        ModelScore {
            label: label.to_owned(),
            kind,
            ibs,
        }
    }

    #[test]
    fn test_lower_wins() {
        let candidates = [
            candidate("a", Some(ModelKind::Forest), 0.18),
            candidate("b", Some(ModelKind::Cox), 0.21),
        ];
        assert_eq!(select_best(&candidates, 1e-6).unwrap().label, "a");

        let candidates = [
            candidate("a", Some(ModelKind::Cox), 0.21),
            candidate("b", Some(ModelKind::Forest), 0.18),
        ];
        assert_eq!(select_best(&candidates, 1e-6).unwrap().label, "b");
    }

    #[test]
    fn test_tie_prefers_interpretable_model() {
        let candidates = [
            candidate("forest", Some(ModelKind::Forest), 0.200_000_1),
            candidate("cox", Some(ModelKind::Cox), 0.2),
        ];
        assert_eq!(select_best(&candidates, 1e-6).unwrap().label, "cox");

        let candidates = [
            candidate("forest", Some(ModelKind::Forest), 0.2),
            candidate("cox", Some(ModelKind::Cox), 0.200_000_1),
        ];
        assert_eq!(select_best(&candidates, 1e-6).unwrap().label, "cox");
        assert_eq!(select_best(&candidates, 0.0).unwrap().label, "forest");
    }

    #[test]
    fn test_tie_keeps_input_order() {
        let candidates = [
            candidate("first", None, 0.2),
            candidate("second", None, 0.2),
        ];
        assert_eq!(select_best(&candidates, 1e-6).unwrap().label, "first");

        let candidates = [
            candidate("unknown", None, 0.2),
            candidate("forest", Some(ModelKind::Forest), 0.2),
        ];
        assert_eq!(select_best(&candidates, 1e-6).unwrap().label, "forest");
    }

    #[test]
    fn test_errors() {
        assert_eq!(select_best(&[], 1e-6), Err(ComparisonError::NoCandidates));
        assert!(matches!(
            select_best(&[candidate("x", None, f64::NAN)], 1e-6),
            Err(ComparisonError::NonFiniteScore { .. })
        ));
        assert!(matches!(
            select_best(&[candidate("x", None, 0.1)], -1.0),
            Err(ComparisonError::InvalidTolerance { .. })
        ));
    }

    /// Survival is 1 before the subject's `tenure` covariate and 0 after, or
    /// a flat `fallback` when set.
    struct StepModel {
        fallback: Option<f64>,
    }

    impl SurvivalPredictor for StepModel {
        fn support(&self) -> TimeSupport {
            TimeSupport {
                min_time: 0.0,
                max_time: 5.0,
            }
        }

        fn predict_survival(
            &self,
            covariates: &Covariates,
            times: &[f64],
        ) -> Result<Vec<f64>, PredictError> {
            if let Some(p) = self.fallback {
                return Ok(vec![p; times.len()]);
            }
            let tenure = covariates
                .get("tenure")
                .and_then(CovariateValue::as_numeric)
                .unwrap_or(f64::INFINITY);
            Ok(times
                .iter()
                .map(|&t| if t < tenure { 1.0 } else { 0.0 })
                .collect())
        }
    }

    fn employees() -> Vec<SurvivalRecord> {
        [1.0, 2.0, 3.0, 4.0, 5.0]
            .into_iter()
            .map(|duration| SurvivalRecord {
                duration,
                event: true,
                covariates: Covariates::from([("tenure", CovariateValue::Numeric(duration))]),
            })
            .collect()
    }

    /// Scores each model, writes `<label>.csv` with intervals and reads the
    /// points back into candidates.
    fn scored_candidates(models: &[(&str, ModelKind, StepModel)]) -> Vec<ModelScore> {
        let test = employees();
        let times = evaluation_times(&test);
        let dir = tempfile::tempdir().unwrap();
        models
            .iter()
            .map(|(label, kind, model)| {
                let table = score(model, &test, &times, &ScoreOptions::default()).unwrap();
                let path = dir.path().join(format!("{label}.csv"));
                table.write_csv_path(&path).unwrap();

                let text = std::fs::read_to_string(&path).unwrap();
                assert!(text.lines().skip(1).all(|line| line.contains('[')));
                let restored = ScoreTable::read_csv_path(&path).unwrap();
                assert_eq!(restored.points(), table.points());

                let ibs = integrated_brier_score(&restored).unwrap();
                assert_eq!(ibs, integrated_brier_score(&table).unwrap());
                ModelScore {
                    label: (*label).to_owned(),
                    kind: Some(*kind),
                    ibs,
                }
            })
            .collect()
    }

    #[test]
    fn test_score_export_reload_and_select() {
        let candidates = scored_candidates(&[
            ("forest", ModelKind::Forest, StepModel { fallback: Some(0.5) }),
            ("cox", ModelKind::Cox, StepModel { fallback: None }),
        ]);
        // A flat 0.5 scores 0.25 at every time; the area over [1, 5] is 1.
        assert_abs_diff_eq!(candidates[0].ibs, 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(candidates[1].ibs, 0.0, epsilon = 1e-12);
        let best = select_best(&candidates, DEFAULT_TIE_TOLERANCE).unwrap();
        assert_eq!(best.label, "cox");
    }

    #[test]
    fn test_score_export_reload_tie_goes_to_cox() {
        let candidates = scored_candidates(&[
            ("forest", ModelKind::Forest, StepModel { fallback: Some(0.3) }),
            ("cox", ModelKind::Cox, StepModel { fallback: Some(0.3) }),
        ]);
        assert_eq!(candidates[0].ibs, candidates[1].ibs);
        let best = select_best(&candidates, DEFAULT_TIE_TOLERANCE).unwrap();
        assert_eq!(best.kind, Some(ModelKind::Cox));
    }
}
