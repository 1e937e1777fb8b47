//! Steps shared by the `fit`, `score` and `report` commands.

use std::path::Path;

use anyhow::Context;
use attrition_data::{
    dataset::Dataset,
    record::SurvivalRecord,
    split::{TrainTestSplit, stratified_split},
};
use attrition_models::{ModelKind, SurvivalPredictor, fitted::FittedModel};
use attrition_scoring::{
    brier::{evaluation_times, score},
    concordance::{concordance_index, risk_scores},
    ibs::integrated_brier_score,
    table::ScoreTable,
};
use serde::Serialize;

use crate::config::AnalysisConfig;

pub(crate) fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    Dataset::from_csv_path(path)
        .with_context(|| format!("Failed to load dataset: {}", path.display()))
}

/// Loads a dataset and splits it the same way for every command, so that a
/// model fitted by `fit` is scored by `score` on records it never saw.
pub(crate) fn load_split(
    path: &Path,
    config: &AnalysisConfig,
) -> anyhow::Result<(Dataset, TrainTestSplit)> {
    let dataset = load_dataset(path)?;
    let split = stratified_split(&dataset.records, config.test_fraction, config.seed)
        .context("Failed to split dataset into train and test sets")?;
    Ok((dataset, split))
}

pub(crate) fn fit_model(
    kind: ModelKind,
    split: &TrainTestSplit,
    config: &AnalysisConfig,
) -> anyhow::Result<FittedModel> {
    FittedModel::fit(kind, &split.train, &config.models)
        .with_context(|| format!("Failed to fit {} model", kind.label()))
}

/// Distinct test durations that lie within the model's training support.
///
/// Later times cannot be scored, so they are dropped with a warning.
pub(crate) fn supported_times(model: &impl SurvivalPredictor, split: &TrainTestSplit) -> Vec<f64> {
    let max_time = model.support().max_time;
    let all = evaluation_times(&split.test);
    let (kept, dropped): (Vec<_>, Vec<_>) = all.into_iter().partition(|&t| t <= max_time);
    if !dropped.is_empty() {
        log::warn!(
            "Dropping {} evaluation times beyond the training support (max {max_time})",
            dropped.len()
        );
    }
    kept
}

/// Accuracy of one fitted model on the test set.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Evaluation {
    pub kind: ModelKind,
    #[serde(skip)]
    pub table: ScoreTable,
    pub ibs: f64,
    pub concordance: f64,
}

pub(crate) fn evaluate(
    model: &FittedModel,
    split: &TrainTestSplit,
    config: &AnalysisConfig,
) -> anyhow::Result<Evaluation> {
    let kind = model.kind();
    let times = supported_times(model, split);
    let table = score(model, &split.test, &times, &config.score_options())
        .with_context(|| format!("Failed to score {} model", kind.label()))?;
    let ibs = integrated_brier_score(&table)
        .with_context(|| format!("Failed to integrate Brier scores of {} model", kind.label()))?;

    let risks = risk_scores(model, &split.test, &times)
        .with_context(|| format!("Failed to compute risk scores of {} model", kind.label()))?;
    let observations = split
        .test
        .iter()
        .map(SurvivalRecord::observation)
        .collect::<Vec<_>>();
    let concordance = concordance_index(&observations, &risks)
        .with_context(|| format!("Failed to compute concordance of {} model", kind.label()))?;

    log::info!(
        "{}: IBS {ibs:.4}, C-index {concordance:.3} over {} evaluation times",
        kind.label(),
        table.len()
    );
    Ok(Evaluation {
        kind,
        table,
        ibs,
        concordance,
    })
}
