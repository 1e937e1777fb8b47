//! Integrated Brier score.

use attrition_stats::integrate::{IntegrationError, time_normalized_trapezoid};

use crate::table::ScoreTable;

/// Collapses a score table into a single number: the trapezoidal area under
/// the Brier curve divided by the last evaluation time.
///
/// Lower is better; 0.25 is the score of predicting 50% survival for
/// everyone on uncensored data.
///
/// # Examples
///
/// ```
/// use attrition_scoring::{
///     ibs::integrated_brier_score,
///     interval::BrierEstimate,
///     table::{ScoreRow, ScoreTable},
/// };
///
/// let rows = [(0.0, 0.0), (1.0, 0.2), (2.0, 0.4)]
///     .into_iter()
///     .map(|(time, point)| ScoreRow { time, brier: BrierEstimate::exact(point) })
///     .collect();
/// let table = ScoreTable::new(rows).unwrap();
/// assert!((integrated_brier_score(&table).unwrap() - 0.2).abs() < 1e-12);
/// ```
pub fn integrated_brier_score(table: &ScoreTable) -> Result<f64, IntegrationError> {
    time_normalized_trapezoid(&table.points())
}
