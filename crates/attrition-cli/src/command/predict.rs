use std::path::PathBuf;

use anyhow::Context;
use attrition_data::record::{CovariateKind, CovariateValue, Covariates};
use attrition_models::{
    SurvivalPredictor,
    fitted::{FittedModel, SurvivalPrediction},
};
use clap::Args;

use crate::util;

#[derive(Debug, Clone, Args)]
pub(crate) struct PredictArg {
    /// Fitted model JSON file
    #[arg(long)]
    pub model: PathBuf,
    /// Employee profile JSON file: an object mapping covariate names to values
    #[arg(long)]
    pub profile: PathBuf,
    /// Covariate to vary, as `name=value1,value2,...`
    #[arg(long, value_parser = parse_variation)]
    pub vary: Option<Variation>,
    /// Times (months) at which to report survival (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub times: Vec<f64>,
}

/// One covariate and the values to substitute for it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Variation {
    pub name: String,
    pub values: Vec<CovariateValue>,
}

fn parse_variation(s: &str) -> Result<Variation, String> {
    let (name, values) = s
        .split_once('=')
        .ok_or_else(|| format!("expected `name=value1,value2`, got `{s}`"))?;
    let name = name.trim();
    let kind = CovariateKind::of(name).ok_or_else(|| format!("unknown covariate `{name}`"))?;
    let values = values
        .split(',')
        .map(|v| CovariateValue::parse(kind, v).map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Variation {
        name: name.to_owned(),
        values,
    })
}

pub(crate) fn run(arg: &PredictArg) -> anyhow::Result<()> {
    let model = util::read_model_file(&arg.model)?;
    let profile: Covariates = util::read_json_file("profile", &arg.profile)?;
    let times = if arg.times.is_empty() {
        default_times(&model)
    } else {
        arg.times.clone()
    };

    let profiles = match &arg.vary {
        Some(variation) => variation
            .values
            .iter()
            .map(|value| {
                (
                    format!("{}={value}", variation.name),
                    profile.with(variation.name.clone(), value.clone()),
                )
            })
            .collect(),
        None => vec![("profile".to_owned(), profile)],
    };

    let predictions = predict_profiles(&model, &profiles, &times)?;
    print_predictions(&predictions);
    Ok(())
}

/// Quarter points of the model's time support.
pub(crate) fn default_times(model: &FittedModel) -> Vec<f64> {
    let max_time = model.support().max_time;
    [0.25, 0.5, 0.75, 1.0]
        .into_iter()
        .map(|f| f * max_time)
        .collect()
}

pub(crate) fn predict_profiles(
    model: &FittedModel,
    profiles: &[(String, Covariates)],
    times: &[f64],
) -> anyhow::Result<Vec<(String, SurvivalPrediction)>> {
    profiles
        .iter()
        .map(|(label, covariates)| {
            let prediction = model
                .predict(covariates, times)
                .with_context(|| format!("Failed to predict survival for {label}"))?;
            Ok((label.clone(), prediction))
        })
        .collect()
}

pub(crate) fn print_predictions(predictions: &[(String, SurvivalPrediction)]) {
    let Some((_, first)) = predictions.first() else {
        return;
    };
    print!("  {:>10}", "Month");
    for (label, _) in predictions {
        print!(" {label:>20}");
    }
    println!();
    println!("  {}", "-".repeat(10 + 21 * predictions.len()));
    for (i, time) in first.times.iter().enumerate() {
        print!("  {time:>10.1}");
        for (_, prediction) in predictions {
            print!(" {:>19.1}%", prediction.survival[i] * 100.0);
        }
        println!();
    }
    println!();
    for (label, prediction) in predictions {
        match prediction.median_time() {
            Some(t) => println!("  {label}: half expected to have left by month {t:.1}"),
            None => println!("  {label}: more than half expected to stay through the horizon"),
        }
    }
}
