//! Full turnover analysis in one run
//!
//! Summarises the dataset, fits every model kind on the same training split,
//! scores them on the test split, selects the best by integrated Brier score
//! and illustrates the selected model with two predictions.

use std::path::{Path, PathBuf};

use anyhow::Context;
use attrition_analysis::summary::DatasetSummary;
use attrition_data::record::{CovariateValue, Covariates};
use attrition_models::{ModelKind, fitted::FittedModel, fitted::SurvivalPrediction};
use attrition_scoring::compare::{ModelScore, select_best};
use clap::Args;
use serde::Serialize;

use crate::{
    command::{compare, eda, fit, predict},
    config::AnalysisConfig,
    pipeline::{self, Evaluation},
    util::Output,
};

#[derive(Debug, Clone, Args)]
pub(crate) struct ReportArg {
    /// Path to the turnover CSV file
    pub dataset: PathBuf,
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Random seed for the split, the bootstrap and the forest
    #[arg(long)]
    pub seed: Option<u64>,
    /// Directory for fitted models, score tables, KM curves and `report.json`
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Categorical covariate varied in the illustrative predictions
    #[arg(long, default_value = "coach")]
    pub vary_field: String,
}

#[derive(Debug, Serialize)]
struct ReportJson<'a> {
    config: &'a AnalysisConfig,
    summary: &'a DatasetSummary,
    train_size: usize,
    test_size: usize,
    evaluations: Vec<&'a Evaluation>,
    selected: &'a str,
    predictions: &'a [(String, SurvivalPrediction)],
}

pub(crate) fn run(arg: &ReportArg) -> anyhow::Result<()> {
    let config = AnalysisConfig::load(arg.config.as_deref(), arg.seed)?;
    let (dataset, split) = pipeline::load_split(&arg.dataset, &config)?;
    let summary = DatasetSummary::from_dataset(&dataset);

    println!("Employee Turnover Survival Report");
    println!("=================================\n");
    eda::print_summary(&summary);
    println!();

    let km_dir = arg.output_dir.as_ref().map(|dir| dir.join("km"));
    eda::print_by_covariates(&dataset, &[arg.vary_field.clone()], km_dir.as_deref())?;

    println!(
        "Train/test split: {} / {} records (seed {})",
        split.train.len(),
        split.test.len(),
        config.seed
    );
    println!();

    let mut fitted = Vec::with_capacity(ModelKind::ALL.len());
    for kind in ModelKind::ALL {
        let model = pipeline::fit_model(kind, &split, &config)?;
        let evaluation = pipeline::evaluate(&model, &split, &config)?;
        if let Some(dir) = &arg.output_dir {
            save_model_outputs(dir, &model, &evaluation)?;
        }
        fitted.push((model, evaluation));
    }

    print_evaluations(fitted.iter().map(|(_, evaluation)| evaluation));
    if let Some((model, _)) = fitted.iter().find(|(m, _)| m.kind() == ModelKind::Cox) {
        fit::print_model_summary(model);
        println!();
    }

    let candidates = fitted
        .iter()
        .map(|(_, evaluation)| ModelScore {
            label: evaluation.kind.to_string(),
            kind: Some(evaluation.kind),
            ibs: evaluation.ibs,
        })
        .collect::<Vec<_>>();
    let best =
        select_best(&candidates, config.tie_tolerance).context("Failed to select a model")?;
    compare::print_comparison(&candidates, best);
    println!();

    let (selected, _) = fitted
        .iter()
        .find(|(model, _)| Some(model.kind()) == best.kind)
        .context("Selected model is missing from the fitted models")?;

    let base = split
        .test
        .first()
        .context("Test set is empty")?
        .covariates
        .clone();
    let profiles = illustrative_profiles(selected, &base, &arg.vary_field)?;
    let times = predict::default_times(selected);
    let predictions = predict::predict_profiles(selected, &profiles, &times)?;
    println!(
        "Illustrative predictions ({}, varying {})",
        selected.kind().label(),
        arg.vary_field
    );
    predict::print_predictions(&predictions);

    if let Some(dir) = &arg.output_dir {
        let report = ReportJson {
            config: &config,
            summary: &summary,
            train_size: split.train.len(),
            test_size: split.test.len(),
            evaluations: fitted.iter().map(|(_, evaluation)| evaluation).collect(),
            selected: &best.label,
            predictions: &predictions,
        };
        let path = dir.join("report.json");
        Output::save_json(&report, Some(path.as_path()))?;
        log::info!("Report saved to: {}", path.display());
    }
    Ok(())
}

/// Two copies of `base` that differ only in the first two levels of
/// `field`.
fn illustrative_profiles(
    model: &FittedModel,
    base: &Covariates,
    field: &str,
) -> anyhow::Result<Vec<(String, Covariates)>> {
    let levels = model
        .encoder
        .levels(field)
        .with_context(|| format!("'{field}' is not a categorical covariate of the model"))?;
    anyhow::ensure!(
        levels.len() >= 2,
        "'{field}' has fewer than two levels in the training data"
    );
    Ok(levels
        .iter()
        .take(2)
        .map(|level| {
            (
                format!("{field}={level}"),
                base.with(field, CovariateValue::Categorical((*level).to_owned())),
            )
        })
        .collect())
}

fn save_model_outputs(
    dir: &Path,
    model: &FittedModel,
    evaluation: &Evaluation,
) -> anyhow::Result<()> {
    let kind = model.kind();
    let model_path = dir.join(format!("{kind}_model.json"));
    Output::save_json(model, Some(model_path.as_path()))?;

    let table_path = dir.join(format!("{kind}.csv"));
    let mut output = Output::open(&table_path)?;
    evaluation
        .table
        .write_csv(&mut output)
        .with_context(|| format!("Failed to write score table: {}", table_path.display()))?;
    log::info!("Saved {kind} model and score table to: {}", dir.display());
    Ok(())
}

fn print_evaluations<'a>(evaluations: impl IntoIterator<Item = &'a Evaluation>) {
    println!("Model Accuracy on the Test Set");
    println!("  {:<28} {:>8} {:>10} {:>8}", "Model", "Times", "IBS", "C-index");
    println!("  {}", "-".repeat(57));
    for evaluation in evaluations {
        println!(
            "  {:<28} {:>8} {:>10.4} {:>8.3}",
            evaluation.kind.label(),
            evaluation.table.len(),
            evaluation.ibs,
            evaluation.concordance
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use attrition_data::record::SurvivalRecord;
    use attrition_models::{ModelParams, forest::ForestParams};

    use super::*;

    fn categorical(level: &str) -> CovariateValue {
        CovariateValue::Categorical(level.to_owned())
    }

    fn record(i: u32) -> SurvivalRecord {
        let coached = i % 2 == 0;
        SurvivalRecord {
            duration: f64::from(i % 10 + 1),
            event: i % 3 != 0,
            covariates: Covariates::from([
                ("gender", categorical("f")),
                ("age", CovariateValue::Numeric(20.0 + f64::from(i))),
                ("industry", categorical("IT")),
                ("profession", categorical("HR")),
                ("traffic", categorical("youjs")),
                ("coach", categorical(if coached { "yes" } else { "no" })),
                ("head_gender", categorical("m")),
                ("greywage", categorical("white")),
                ("transport", categorical("bus")),
                ("extraversion", CovariateValue::Numeric(f64::from(i % 10))),
                ("independ", CovariateValue::Numeric(5.0)),
                ("selfcontrol", CovariateValue::Numeric(f64::from(i % 9))),
                ("anxiety", CovariateValue::Numeric(f64::from(i % 6))),
                ("novator", CovariateValue::Numeric(4.0)),
            ]),
        }
    }

    #[test]
    fn test_illustrative_profiles() {
        let records = (0..40).map(record).collect::<Vec<_>>();
        let params = ModelParams {
            forest: ForestParams {
                n_trees: 5,
                ..ForestParams::default()
            },
            ..ModelParams::default()
        };
        let model = FittedModel::fit(ModelKind::Forest, &records, &params).unwrap();
        let base = records[1].covariates.clone();

        let profiles = illustrative_profiles(&model, &base, "coach").unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].0, "coach=no");
        assert_eq!(profiles[1].0, "coach=yes");
        assert_eq!(profiles[1].1.get("coach"), Some(&categorical("yes")));
        assert_eq!(profiles[0].1.get("age"), base.get("age"));

        // numeric, single-level and unknown covariates cannot be varied
        assert!(illustrative_profiles(&model, &base, "age").is_err());
        assert!(illustrative_profiles(&model, &base, "industry").is_err());
        assert!(illustrative_profiles(&model, &base, "missing").is_err());
    }
}
