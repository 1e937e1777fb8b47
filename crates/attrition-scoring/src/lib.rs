//! Accuracy of survival models over time.
//!
//! The pipeline turns a fitted model into one number per candidate:
//!
//! 1. [`brier::score`] evaluates the censoring-weighted Brier score at each
//!    evaluation time and attaches a bootstrap confidence interval
//! 2. the table is exported as `point [low;high]` strings and read back with
//!    [`interval::strip_confidence_interval`] recovering the points
//! 3. [`ibs::integrated_brier_score`] integrates the curve with the
//!    trapezoidal rule and normalises by the last time
//! 4. [`compare::select_best`] keeps the lowest score
//!
//! [`concordance`] adds Harrell's C-index as a secondary, ranking-only metric.
//!
//! # Example
//!
//! ```no_run
//! use attrition_data::{dataset::Dataset, split::stratified_split};
//! use attrition_models::{ModelKind, ModelParams, fitted::FittedModel};
//! use attrition_scoring::{
//!     brier::{ScoreOptions, evaluation_times, score},
//!     compare::{DEFAULT_TIE_TOLERANCE, ModelScore, select_best},
//!     ibs::integrated_brier_score,
//! };
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let dataset = Dataset::from_csv_path("turnover.csv")?;
//! let split = stratified_split(&dataset.records, 0.2, 42)?;
//!
//! let mut candidates = vec![];
//! for kind in ModelKind::ALL {
//!     let model = FittedModel::fit(kind, &split.train, &ModelParams::default())?;
//!     let times = evaluation_times(&split.test)
//!         .into_iter()
//!         .filter(|&t| t <= model.support.max_time)
//!         .collect::<Vec<_>>();
//!     let table = score(&model, &split.test, &times, &ScoreOptions::default())?;
//!     candidates.push(ModelScore {
//!         label: kind.to_string(),
//!         kind: Some(kind),
//!         ibs: integrated_brier_score(&table)?,
//!     });
//! }
//! let best = select_best(&candidates, DEFAULT_TIE_TOLERANCE)?;
//! println!("best model: {} (IBS {:.4})", best.label, best.ibs);
//! # Ok(())
//! # }
//! ```

pub mod brier;
pub mod compare;
pub mod concordance;
pub mod ibs;
pub mod interval;
pub mod table;
