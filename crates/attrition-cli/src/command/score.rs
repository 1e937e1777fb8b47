use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::{
    config::AnalysisConfig,
    pipeline,
    util::{self, Output},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct ScoreArg {
    /// Path to the turnover CSV file the model was fitted on
    pub dataset: PathBuf,
    /// Fitted model JSON file
    #[arg(long)]
    pub model: PathBuf,
    /// Output CSV file for the score table (stdout when omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// JSON configuration file (must match the one used for fitting)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Random seed for the split and the bootstrap
    #[arg(long)]
    pub seed: Option<u64>,
}

pub(crate) fn run(arg: &ScoreArg) -> anyhow::Result<()> {
    let config = AnalysisConfig::load(arg.config.as_deref(), arg.seed)?;
    let model = util::read_model_file(&arg.model)?;
    let (_dataset, split) = pipeline::load_split(&arg.dataset, &config)?;
    let evaluation = pipeline::evaluate(&model, &split, &config)?;

    let mut output = Output::from_output_path(arg.output.as_deref())?;
    evaluation
        .table
        .write_csv(&mut output)
        .with_context(|| format!("Failed to write score table to {}", output.display_path()))?;

    log::info!(
        "Integrated Brier score: {:.4} (C-index {:.3})",
        evaluation.ibs,
        evaluation.concordance
    );
    Ok(())
}
