use std::path::PathBuf;

use attrition_models::{ModelKind, fitted::FittedModel};
use clap::Args;

use crate::{config::AnalysisConfig, pipeline, util::Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct FitArg {
    /// Path to the turnover CSV file
    pub dataset: PathBuf,
    /// Model to fit: `cox` or `forest`
    #[arg(long)]
    pub kind: ModelKind,
    /// Output file path for the fitted model (stdout when omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Random seed for the split and the forest
    #[arg(long)]
    pub seed: Option<u64>,
}

pub(crate) fn run(arg: &FitArg) -> anyhow::Result<()> {
    let FitArg {
        dataset,
        kind,
        output,
        config,
        seed,
    } = arg;
    let config = AnalysisConfig::load(config.as_deref(), *seed)?;
    let (_dataset, split) = pipeline::load_split(dataset, &config)?;
    let model = pipeline::fit_model(*kind, &split, &config)?;

    Output::save_json(&model, output.as_deref())?;

    log::info!("Model saved successfully");
    if let Some(path) = output {
        log::info!("  Path: {}", path.display());
        print_model_summary(&model);
    }
    Ok(())
}

pub(crate) fn print_model_summary(model: &FittedModel) {
    println!("{}", model.kind().label());
    println!("  Trained at: {}", model.trained_at);
    println!("  Training records: {}", model.training_size);
    println!(
        "  Time support: {:.1} - {:.1}",
        model.support.min_time, model.support.max_time
    );
    let Some(rows) = model.coefficient_summary() else {
        return;
    };
    println!();
    println!(
        "  {:<28} {:>10} {:>10} {:>10} {:>8}",
        "Feature", "Coef", "exp(Coef)", "SE", "z"
    );
    println!("  {}", "-".repeat(70));
    for row in rows {
        println!(
            "  {:<28} {:>10.4} {:>10.4} {:>10.4} {:>8.2}",
            row.feature, row.coefficient, row.hazard_ratio, row.standard_error, row.z
        );
    }
}
