use clap::{Parser, Subcommand};

use self::{
    compare::CompareArg, eda::EdaArg, fit::FitArg, predict::PredictArg, report::ReportArg,
    score::ScoreArg,
};

mod compare;
mod eda;
mod fit;
mod predict;
mod report;
mod score;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Summarise a dataset and its survival by covariate
    Eda(#[clap(flatten)] EdaArg),
    /// Fit a survival model on the training split and save it as JSON
    Fit(#[clap(flatten)] FitArg),
    /// Score a saved model on the test split
    Score(#[clap(flatten)] ScoreArg),
    /// Pick the best model from saved score tables
    Compare(#[clap(flatten)] CompareArg),
    /// Predict survival curves for an employee profile
    Predict(#[clap(flatten)] PredictArg),
    /// Run the whole analysis: summary, fitting, scoring, selection, predictions
    Report(#[clap(flatten)] ReportArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Eda(arg) => eda::run(&arg)?,
        Mode::Fit(arg) => fit::run(&arg)?,
        Mode::Score(arg) => score::run(&arg)?,
        Mode::Compare(arg) => compare::run(&arg)?,
        Mode::Predict(arg) => predict::run(&arg)?,
        Mode::Report(arg) => report::run(&arg)?,
    }
    Ok(())
}
