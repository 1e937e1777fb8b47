//! Survival models for employee turnover.
//!
//! Two estimators are provided, both fitted on one-hot encoded covariates:
//!
//! - [`cox::CoxModel`]: semi-parametric proportional-hazards regression
//! - [`forest::SurvivalForest`]: ensemble of log-rank survival trees
//!
//! [`fitted::FittedModel`] bundles an estimator with the feature encoder it was
//! trained with, so it can be queried with named covariates and saved to disk.
//! Everything downstream (scoring, comparison, prediction) only sees the
//! [`SurvivalPredictor`] capability.
//!
//! # Example
//!
//! ```no_run
//! use attrition_data::{dataset::Dataset, split::stratified_split};
//! use attrition_models::{ModelKind, ModelParams, SurvivalPredictor, fitted::FittedModel};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let dataset = Dataset::from_csv_path("turnover.csv")?;
//! let split = stratified_split(&dataset.records, 0.2, 42)?;
//! let model = FittedModel::fit(ModelKind::Cox, &split.train, &ModelParams::default())?;
//!
//! let survival = model.predict_survival(&split.test[0].covariates, &[6.0, 12.0, 24.0])?;
//! println!("{survival:?}");
//! # Ok(())
//! # }
//! ```

use attrition_data::{encoding::EncodeError, record::Covariates};
use serde::{Deserialize, Serialize};

use crate::{cox::CoxParams, forest::ForestParams};

mod cholesky;
pub mod cox;
pub mod fitted;
pub mod forest;

/// Which estimator a model uses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[display("cox")]
    Cox,
    #[display("forest")]
    Forest,
}

impl ModelKind {
    pub const ALL: [Self; 2] = [Self::Cox, Self::Forest];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Cox => "Cox proportional hazards",
            Self::Forest => "Random survival forest",
        }
    }

    /// Lower is easier to interpret. Used to break ties between models that
    /// score the same.
    #[must_use]
    pub fn interpretability_rank(self) -> u8 {
        match self {
            Self::Cox => 0,
            Self::Forest => 1,
        }
    }
}

/// Parameters of every estimator, as read from a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub cox: CoxParams,
    pub forest: ForestParams,
}

/// Range of observation times a model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSupport {
    pub min_time: f64,
    pub max_time: f64,
}

impl TimeSupport {
    #[must_use]
    pub fn from_observations(observations: &[(f64, bool)]) -> Self {
        let (min_time, max_time) = observations.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), &(t, _)| (lo.min(t), hi.max(t)),
        );
        Self { min_time, max_time }
    }

    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        (0.0..=self.max_time).contains(&time)
    }
}

/// Error returned when a model cannot be fitted.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum FitError {
    #[display("no training samples")]
    NoSamples,
    #[display("training data contains no events")]
    NoEvents,
    #[display("feature rows ({rows}) and observations ({observations}) differ in length")]
    LengthMismatch { rows: usize, observations: usize },
    #[display("feature row {row} has {found} values, expected {expected}")]
    RaggedFeatures {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[display("observation {index} has invalid time {time}")]
    InvalidTime { index: usize, time: f64 },
    #[display("information matrix is singular at iteration {iteration}; try a larger penalizer")]
    SingularInformation { iteration: usize },
    #[display("invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    #[display("failed to encode training covariates: {_0}")]
    Encode(#[error(source)] EncodeError),
}

/// Error returned when a prediction is requested outside the model's domain.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum PredictError {
    #[display("{_0}")]
    Encode(#[error(source)] EncodeError),
    #[display("prediction time {time} must be a non-negative finite number")]
    InvalidTime { time: f64 },
}

/// The capability of predicting survival probabilities for named covariates.
pub trait SurvivalPredictor {
    /// Observation times covered by the training data.
    fn support(&self) -> TimeSupport;

    /// Probability of not having had the event by each of `times`.
    ///
    /// The result is parallel to `times`.
    fn predict_survival(
        &self,
        covariates: &Covariates,
        times: &[f64],
    ) -> Result<Vec<f64>, PredictError>;
}

/// Validates the shape of training data and returns the feature count.
fn check_training_data(
    features: &[Vec<f64>],
    observations: &[(f64, bool)],
) -> Result<usize, FitError> {
    if observations.is_empty() {
        return Err(FitError::NoSamples);
    }
    if features.len() != observations.len() {
        return Err(FitError::LengthMismatch {
            rows: features.len(),
            observations: observations.len(),
        });
    }
    let expected = features[0].len();
    if let Some((row, found)) = features
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|&(_, len)| len != expected)
    {
        return Err(FitError::RaggedFeatures {
            row,
            expected,
            found,
        });
    }
    if let Some((index, &(time, _))) = observations
        .iter()
        .enumerate()
        .find(|(_, (t, _))| !t.is_finite() || *t < 0.0)
    {
        return Err(FitError::InvalidTime { index, time });
    }
    if !observations.iter().any(|&(_, event)| event) {
        return Err(FitError::NoEvents);
    }
    Ok(expected)
}
