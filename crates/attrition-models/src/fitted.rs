//! Trained models that can be queried with named covariates and persisted.

use attrition_data::{
    encoding::FeatureEncoder,
    record::{Covariates, SurvivalRecord},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    FitError, ModelKind, ModelParams, PredictError, SurvivalPredictor, TimeSupport,
    cox::CoxModel, forest::SurvivalForest,
};

/// The estimator inside a [`FittedModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Cox(CoxModel),
    Forest(SurvivalForest),
}

/// One row of a Cox coefficient summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    pub feature: String,
    pub coefficient: f64,
    pub hazard_ratio: f64,
    pub standard_error: f64,
    pub z: f64,
}

/// An estimator together with the encoder and metadata it was trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub trained_at: DateTime<Utc>,
    pub training_size: usize,
    pub support: TimeSupport,
    pub encoder: FeatureEncoder,
    pub estimator: Estimator,
}

/// Survival probabilities on a time grid for one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurvivalPrediction {
    pub times: Vec<f64>,
    pub survival: Vec<f64>,
}

impl SurvivalPrediction {
    /// First grid time at which the survival probability is at most 50%.
    #[must_use]
    pub fn median_time(&self) -> Option<f64> {
        self.times
            .iter()
            .zip(&self.survival)
            .find(|&(_, &s)| s <= 0.5)
            .map(|(&t, _)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.survival.iter().copied())
    }
}

impl FittedModel {
    /// Fits an estimator of the given kind on training records.
    pub fn fit(
        kind: ModelKind,
        train: &[SurvivalRecord],
        params: &ModelParams,
    ) -> Result<Self, FitError> {
        let encoder = FeatureEncoder::fit(train).map_err(FitError::Encode)?;
        Self::fit_with_encoder(kind, train, encoder, params)
    }

    /// Fits an estimator using an already fitted encoder.
    pub fn fit_with_encoder(
        kind: ModelKind,
        train: &[SurvivalRecord],
        encoder: FeatureEncoder,
        params: &ModelParams,
    ) -> Result<Self, FitError> {
        let features = encoder.encode_all(train).map_err(FitError::Encode)?;
        let observations = train
            .iter()
            .map(SurvivalRecord::observation)
            .collect::<Vec<_>>();

        log::info!(
            "Fitting {} on {} records ({} encoded features)",
            kind.label(),
            train.len(),
            encoder.n_features()
        );
        let estimator = match kind {
            ModelKind::Cox => {
                Estimator::Cox(CoxModel::fit(&features, &observations, &params.cox)?)
            }
            ModelKind::Forest => Estimator::Forest(SurvivalForest::fit(
                &features,
                &observations,
                &params.forest,
            )?),
        };

        Ok(Self {
            trained_at: Utc::now(),
            training_size: train.len(),
            support: TimeSupport::from_observations(&observations),
            encoder,
            estimator,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ModelKind {
        match self.estimator {
            Estimator::Cox(_) => ModelKind::Cox,
            Estimator::Forest(_) => ModelKind::Forest,
        }
    }

    /// Predicts survival on a time grid, keeping the grid alongside.
    pub fn predict(
        &self,
        covariates: &Covariates,
        times: &[f64],
    ) -> Result<SurvivalPrediction, PredictError> {
        Ok(SurvivalPrediction {
            times: times.to_vec(),
            survival: self.predict_survival(covariates, times)?,
        })
    }

    /// Per-feature coefficients of a Cox model; `None` for other estimators.
    #[must_use]
    pub fn coefficient_summary(&self) -> Option<Vec<CoefficientRow>> {
        let Estimator::Cox(cox) = &self.estimator else {
            return None;
        };
        let rows = self
            .encoder
            .feature_names()
            .into_iter()
            .zip(&cox.coefficients)
            .zip(&cox.standard_errors)
            .map(|((feature, &coefficient), &standard_error)| CoefficientRow {
                feature,
                coefficient,
                hazard_ratio: coefficient.exp(),
                standard_error,
                z: coefficient / standard_error,
            })
            .collect();
        Some(rows)
    }
}

impl SurvivalPredictor for FittedModel {
    fn support(&self) -> TimeSupport {
        self.support
    }

    fn predict_survival(
        &self,
        covariates: &Covariates,
        times: &[f64],
    ) -> Result<Vec<f64>, PredictError> {
        if let Some(&time) = times.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return Err(PredictError::InvalidTime { time });
        }
        let features = self
            .encoder
            .encode(covariates)
            .map_err(PredictError::Encode)?;
        Ok(match &self.estimator {
            Estimator::Cox(cox) => cox.survival_function(&features, times),
            Estimator::Forest(forest) => forest.survival_function(&features, times),
        })
    }
}
