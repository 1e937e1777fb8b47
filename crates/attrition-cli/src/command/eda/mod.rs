//! Exploratory data analysis command
//!
//! Prints a dataset summary and Kaplan-Meier survival statistics grouped by
//! covariate, optionally exporting the curves as CSV.

mod table;

use std::path::{Path, PathBuf};

use anyhow::Context;
use attrition_analysis::{summary::DatasetSummary, survival::SurvivalStatsMap};
use attrition_data::{dataset::Dataset, record::COVARIATE_SCHEMA};
use clap::Args;

use self::table::SurvivalTableRow;
use crate::{pipeline, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct EdaArg {
    /// Path to the turnover CSV file
    pub dataset: PathBuf,

    /// Covariates to group by (comma-separated); all covariates when omitted
    #[arg(long, value_delimiter = ',')]
    pub by: Vec<String>,

    /// Output directory for KM curve CSV files
    #[arg(long)]
    pub km_output_dir: Option<PathBuf>,
}

pub(crate) fn run(arg: &EdaArg) -> anyhow::Result<()> {
    let dataset = pipeline::load_dataset(&arg.dataset)?;
    let columns = if arg.by.is_empty() {
        COVARIATE_SCHEMA
            .iter()
            .map(|(name, _)| (*name).to_owned())
            .collect()
    } else {
        arg.by.clone()
    };

    println!("Employee Turnover Survival Report");
    println!("=================================\n");

    print_summary(&DatasetSummary::from_dataset(&dataset));
    println!();

    table::print_legend();
    println!();

    print_by_covariates(&dataset, &columns, arg.km_output_dir.as_deref())?;
    Ok(())
}

pub(crate) fn print_by_covariates(
    dataset: &Dataset,
    columns: &[String],
    km_output_dir: Option<&Path>,
) -> anyhow::Result<()> {
    for column in columns {
        let stats = SurvivalStatsMap::collect_by_covariate(&dataset.records, column)
            .with_context(|| format!("Failed to group records by '{column}'"))?;
        let rows = stats
            .map
            .iter()
            .map(|(label, stats)| SurvivalTableRow {
                label: label.clone(),
                stats,
            })
            .collect::<Vec<_>>();

        println!("Survival by {column}");
        table::print_survival_table(column, &rows);
        println!();

        if let Some(dir) = km_output_dir {
            let path = dir.join(format!("{column}_km.csv"));
            util::save_km_curves(
                &path,
                stats
                    .map
                    .iter()
                    .map(|(label, stats)| (label.as_str(), &stats.km_curve)),
            )?;
        }
    }
    Ok(())
}

#[expect(clippy::cast_precision_loss)]
pub(crate) fn print_summary(summary: &DatasetSummary) {
    println!("Overall Statistics:");
    println!(
        "  Records: {} ({} duplicates removed)",
        summary.records, summary.duplicates_removed
    );
    println!(
        "  Events: {} quit ({:.1}%), {} censored ({:.1}%)",
        summary.events,
        summary.event_rate * 100.0,
        summary.records - summary.events,
        100.0 * (summary.records - summary.events) as f64 / summary.records.max(1) as f64
    );
    if let Some(duration) = &summary.duration {
        println!(
            "  Tenure (months): mean {:.1}, median {:.1}, min {:.1}, max {:.1}",
            duration.mean, duration.median, duration.min, duration.max
        );
    }

    println!();
    println!("Numeric covariates:");
    println!(
        "  {:<14} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Name", "Mean", "StdDev", "Min", "Median", "Max"
    );
    println!("  {}", "-".repeat(59));
    for (name, stats) in &summary.numeric {
        println!(
            "  {:<14} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            name, stats.mean, stats.std_dev, stats.min, stats.median, stats.max
        );
    }

    println!();
    println!("Categorical covariates:");
    for (name, counts) in &summary.categorical {
        let levels = counts
            .iter()
            .map(|(level, count)| format!("{level}={count}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {name:<14} {levels}");
    }
}
