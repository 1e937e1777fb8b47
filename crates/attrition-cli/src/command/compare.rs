use std::path::PathBuf;

use anyhow::Context;
use attrition_models::ModelKind;
use attrition_scoring::{
    compare::{DEFAULT_TIE_TOLERANCE, ModelScore, select_best},
    ibs::integrated_brier_score,
    table::ScoreTable,
};
use clap::Args;

#[derive(Debug, Clone, Args)]
pub(crate) struct CompareArg {
    /// Score table CSV files written by `score`; a file named after a model
    /// kind (e.g. `cox.csv`) takes part in tie-breaking
    #[arg(required = true)]
    pub tables: Vec<PathBuf>,
    /// IBS difference below which models count as tied
    #[arg(long, default_value_t = DEFAULT_TIE_TOLERANCE)]
    pub tie_tolerance: f64,
}

pub(crate) fn run(arg: &CompareArg) -> anyhow::Result<()> {
    let candidates = load_candidates(&arg.tables)?;
    let best = select_best(&candidates, arg.tie_tolerance).context("Failed to select a model")?;
    print_comparison(&candidates, best);
    Ok(())
}

/// Reads each score table and integrates it. The file stem becomes the label,
/// and the model kind when it names one.
pub(crate) fn load_candidates(paths: &[PathBuf]) -> anyhow::Result<Vec<ModelScore>> {
    paths
        .iter()
        .map(|path| {
            let table = ScoreTable::read_csv_path(path)
                .with_context(|| format!("Failed to read score table: {}", path.display()))?;
            let ibs = integrated_brier_score(&table).with_context(|| {
                format!("Failed to integrate score table: {}", path.display())
            })?;
            let label = path.file_stem().map_or_else(
                || path.display().to_string(),
                |s| s.to_string_lossy().into_owned(),
            );
            let kind = label.parse::<ModelKind>().ok();
            Ok(ModelScore { label, kind, ibs })
        })
        .collect()
}

pub(crate) fn print_comparison(candidates: &[ModelScore], best: &ModelScore) {
    println!("Model Comparison (lower IBS is better)");
    println!("  {:<28} {:>10}", "Model", "IBS");
    println!("  {}", "-".repeat(39));
    for candidate in candidates {
        let marker = if std::ptr::eq(candidate, best) { " *" } else { "" };
        println!("  {:<28} {:>10.4}{marker}", candidate.label, candidate.ibs);
    }
    println!();
    println!("Selected: {} (IBS {:.4})", best.label, best.ibs);
}

#[cfg(test)]
mod tests {
    use attrition_scoring::{interval::BrierEstimate, table::ScoreRow};

    use super::*;

    fn write_table(dir: &std::path::Path, name: &str, points: &[(f64, f64)]) -> PathBuf {
        let rows = points
            .iter()
            .map(|&(time, point)| ScoreRow {
                time,
                brier: BrierEstimate {
                    point,
                    low: point - 0.02,
                    high: point + 0.02,
                },
            })
            .collect();
        let path = dir.join(name);
        ScoreTable::new(rows).unwrap().write_csv_path(&path).unwrap();
        path
    }

    #[test]
    fn test_kind_from_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let paths = [
            write_table(dir.path(), "forest.csv", &[(1.0, 0.1), (2.0, 0.1)]),
            write_table(dir.path(), "cox.csv", &[(1.0, 0.2), (2.0, 0.2)]),
            write_table(dir.path(), "baseline.csv", &[(1.0, 0.3), (2.0, 0.3)]),
        ];
        let candidates = load_candidates(&paths).unwrap();

        let kinds = candidates.iter().map(|c| c.kind).collect::<Vec<_>>();
        assert_eq!(kinds, [Some(ModelKind::Forest), Some(ModelKind::Cox), None]);
        let labels = candidates.iter().map(|c| c.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, ["forest", "cox", "baseline"]);

        let best = select_best(&candidates, DEFAULT_TIE_TOLERANCE).unwrap();
        assert_eq!(best.label, "forest");
    }

    #[test]
    fn test_tied_tables_select_cox() {
        let dir = tempfile::tempdir().unwrap();
        let curve = [(1.0, 0.12), (3.0, 0.18), (6.0, 0.2)];
        let paths = [
            write_table(dir.path(), "baseline.csv", &curve),
            write_table(dir.path(), "forest.csv", &curve),
            write_table(dir.path(), "cox.csv", &curve),
        ];
        let candidates = load_candidates(&paths).unwrap();
        let best = select_best(&candidates, DEFAULT_TIE_TOLERANCE).unwrap();
        assert_eq!(best.kind, Some(ModelKind::Cox));
        assert_eq!(best.label, "cox");
    }

    #[test]
    fn test_missing_table_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_candidates(&[dir.path().join("cox.csv")]).unwrap_err();
        assert!(format!("{err:#}").contains("cox.csv"));
    }
}
