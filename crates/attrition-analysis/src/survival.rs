//! Survival statistics grouped by covariate.
//!
//! # Examples
//!
//! ```no_run
//! use attrition_analysis::survival::SurvivalStatsMap;
//! use attrition_data::dataset::Dataset;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let dataset = Dataset::from_csv_path("turnover.csv")?;
//! let by_coach = SurvivalStatsMap::collect_by_covariate(&dataset.records, "coach")?;
//! for (level, stats) in &by_coach.map {
//!     println!(
//!         "coach={level}: n={}, KM median={:?}",
//!         stats.count, stats.median_km
//!     );
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use attrition_data::record::{CovariateKind, CovariateValue, SurvivalRecord};
use attrition_stats::{percentiles::quartiles, survival::KaplanMeierCurve};
use serde::Serialize;

/// Error returned when records cannot be grouped by a covariate.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum GroupingError {
    #[display("unknown covariate '{column}'")]
    UnknownCovariate { column: String },
    #[display("record {index} has no usable {kind} value for '{column}'")]
    MissingValue {
        index: usize,
        column: String,
        kind: CovariateKind,
    },
}

/// Survival statistics for a group of observations.
#[derive(Debug, Clone, Serialize)]
pub struct SurvivalStats {
    pub count: usize,
    pub event_count: usize,
    pub censored_count: usize,
    pub event_rate: f64,
    /// Mean time of observed events only.
    pub mean_event_time: f64,
    /// Naive mean over all observations; biased low under censoring.
    pub mean_all: f64,
    pub median_km: Option<f64>,
    pub km_curve: KaplanMeierCurve,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurvivalStatsMap<K> {
    pub map: BTreeMap<K, SurvivalStats>,
}

impl SurvivalStats {
    /// Computes statistics from `(time, event)` observations.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_observations(observations: &[(f64, bool)]) -> Self {
        let count = observations.len();
        let event_times = observations
            .iter()
            .filter(|(_, event)| *event)
            .map(|(t, _)| *t)
            .collect::<Vec<_>>();
        let event_count = event_times.len();

        let mean = |sum: f64, n: usize| if n == 0 { 0.0 } else { sum / n as f64 };
        let mean_event_time = mean(event_times.iter().sum(), event_count);
        let mean_all = mean(observations.iter().map(|(t, _)| t).sum(), count);

        let km_curve = KaplanMeierCurve::from_data(observations.to_vec());
        let median_km = km_curve.median_survival();

        Self {
            count,
            event_count,
            censored_count: count - event_count,
            event_rate: mean(event_count as f64, count),
            mean_event_time,
            mean_all,
            median_km,
            km_curve,
        }
    }
}

impl<K> SurvivalStatsMap<K> {
    /// Groups records by a key computed from each record and computes
    /// survival statistics per group.
    pub fn collect_by_group<F>(records: &[SurvivalRecord], mut group: F) -> Self
    where
        F: FnMut(&SurvivalRecord) -> K,
        K: Ord,
    {
        let mut data_map: BTreeMap<K, Vec<(f64, bool)>> = BTreeMap::new();
        for record in records {
            data_map
                .entry(group(record))
                .or_default()
                .push(record.observation());
        }

        Self {
            map: data_map
                .into_iter()
                .map(|(key, data)| (key, SurvivalStats::from_observations(&data)))
                .collect(),
        }
    }

    /// Total number of observations over all groups.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.map.values().map(|stats| stats.count).sum()
    }
}

impl SurvivalStatsMap<String> {
    /// Groups records by one covariate of the turnover schema.
    ///
    /// Categorical covariates are grouped by level. Numeric covariates are
    /// grouped into quartile bands labelled `Q1 (<= a)` to `Q4 (> c)`, where
    /// `a` and `c` are the 25th and 75th percentiles.
    pub fn collect_by_covariate(
        records: &[SurvivalRecord],
        column: &str,
    ) -> Result<Self, GroupingError> {
        let kind = CovariateKind::of(column).ok_or_else(|| GroupingError::UnknownCovariate {
            column: column.to_owned(),
        })?;
        let missing = |index| GroupingError::MissingValue {
            index,
            column: column.to_owned(),
            kind,
        };

        let keys = match kind {
            CovariateKind::Categorical => records
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    r.covariates
                        .get(column)
                        .and_then(CovariateValue::as_categorical)
                        .map(str::to_owned)
                        .ok_or_else(|| missing(i))
                })
                .collect::<Result<Vec<_>, _>>()?,
            CovariateKind::Numeric => {
                let values = records
                    .iter()
                    .enumerate()
                    .map(|(i, r)| {
                        r.covariates
                            .get(column)
                            .and_then(CovariateValue::as_numeric)
                            .ok_or_else(|| missing(i))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let bands = QuartileBands::new(&values);
                values.iter().map(|&v| bands.label(v)).collect()
            }
        };

        let mut keys = keys.into_iter();
        Ok(Self::collect_by_group(records, |_| {
            keys.next().unwrap_or_default()
        }))
    }
}

struct QuartileBands {
    cutoffs: Vec<f64>,
}

impl QuartileBands {
    fn new(values: &[f64]) -> Self {
        let cutoffs = quartiles(values).map_or_else(Vec::new, Vec::from);
        Self { cutoffs }
    }

    fn label(&self, value: f64) -> String {
        match self.cutoffs.iter().position(|&cut| value <= cut) {
            Some(i) => format!("Q{} (<= {})", i + 1, self.cutoffs[i]),
            None => format!(
                "Q{} (> {})",
                self.cutoffs.len() + 1,
                self.cutoffs.last().copied().unwrap_or(f64::NAN)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use attrition_data::record::Covariates;

    use super::*;

    fn record(duration: f64, event: bool, coach: &str, age: f64) -> SurvivalRecord {
        SurvivalRecord {
            duration,
            event,
            covariates: Covariates::from([
                ("coach", CovariateValue::Categorical(coach.to_owned())),
                ("age", CovariateValue::Numeric(age)),
            ]),
        }
    }

    #[test]
    fn test_stats_from_observations() {
        let stats =
            SurvivalStats::from_observations(&[(10.0, true), (20.0, false), (30.0, true)]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.event_count, 2);
        assert_eq!(stats.censored_count, 1);
        assert_abs_diff_eq!(stats.event_rate, 2.0 / 3.0);
        assert_abs_diff_eq!(stats.mean_event_time, 20.0);
        assert_abs_diff_eq!(stats.mean_all, 20.0);
        assert_eq!(stats.km_curve.times, vec![10.0, 30.0]);
        assert_abs_diff_eq!(stats.median_km.unwrap(), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_stats_without_events() {
        let stats = SurvivalStats::from_observations(&[(5.0, false), (6.0, false)]);
        assert_eq!(stats.event_count, 0);
        assert_abs_diff_eq!(stats.mean_event_time, 0.0);
        assert!(stats.median_km.is_none());
        assert!(stats.km_curve.is_empty());
    }

    #[test]
    fn test_collect_by_categorical() {
        let records = vec![
            record(1.0, true, "no", 20.0),
            record(5.0, false, "yes", 30.0),
            record(2.0, true, "no", 40.0),
            record(8.0, true, "yes", 50.0),
        ];
        let map = SurvivalStatsMap::collect_by_covariate(&records, "coach").unwrap();
        assert_eq!(map.map.keys().collect::<Vec<_>>(), ["no", "yes"]);
        assert_eq!(map.map["no"].count, 2);
        assert_eq!(map.map["yes"].event_count, 1);
        assert_eq!(map.total_count(), 4);
    }

    #[test]
    fn test_collect_by_numeric_quartiles() {
        let records = (1..=8)
            .map(|i| record(f64::from(i), true, "no", f64::from(i * 10)))
            .collect::<Vec<_>>();
        let map = SurvivalStatsMap::collect_by_covariate(&records, "age").unwrap();
        // Interpolated cutoffs: 27.5, 45, 62.5.
        let labels = map.map.keys().cloned().collect::<Vec<_>>();
        assert_eq!(
            labels,
            ["Q1 (<= 27.5)", "Q2 (<= 45)", "Q3 (<= 62.5)", "Q4 (> 62.5)"]
        );
        let counts = map.map.values().map(|s| s.count).collect::<Vec<_>>();
        assert_eq!(counts, [2, 2, 2, 2]);
    }

    #[test]
    fn test_collect_errors() {
        let records = vec![record(1.0, true, "no", 20.0)];
        assert_eq!(
            SurvivalStatsMap::collect_by_covariate(&records, "salary").unwrap_err(),
            GroupingError::UnknownCovariate {
                column: "salary".to_owned()
            }
        );
        assert!(matches!(
            SurvivalStatsMap::collect_by_covariate(&records, "anxiety"),
            Err(GroupingError::MissingValue { index: 0, .. })
        ));
    }

    #[test]
    fn test_collect_by_group_closure() {
        let records = vec![
            record(1.0, true, "no", 20.0),
            record(5.0, false, "yes", 30.0),
        ];
        let map = SurvivalStatsMap::collect_by_group(&records, |r| r.event);
        assert_eq!(map.map[&true].count, 1);
        assert_eq!(map.map[&false].censored_count, 1);
    }
}
