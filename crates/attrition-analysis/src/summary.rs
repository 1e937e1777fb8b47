//! Descriptive overview of a loaded dataset.

use std::collections::BTreeMap;

use attrition_data::{
    dataset::Dataset,
    record::{COVARIATE_SCHEMA, CovariateKind, CovariateValue, SurvivalRecord, event_rate},
};
use attrition_stats::descriptive::DescriptiveStats;
use serde::Serialize;

/// Counts and distributions describing a dataset before modelling.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub records: usize,
    pub duplicates_removed: usize,
    pub events: usize,
    pub event_rate: f64,
    /// Tenure over all records, events and censored alike.
    pub duration: Option<DescriptiveStats>,
    pub numeric: BTreeMap<String, DescriptiveStats>,
    /// Record count per level of each categorical covariate.
    pub categorical: BTreeMap<String, BTreeMap<String, usize>>,
}

impl DatasetSummary {
    #[must_use]
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self::from_records(&dataset.records, dataset.duplicates_removed)
    }

    /// Summarises records over the covariate schema. Covariates absent from
    /// every record are left out.
    #[must_use]
    pub fn from_records(records: &[SurvivalRecord], duplicates_removed: usize) -> Self {
        let mut numeric = BTreeMap::new();
        let mut categorical = BTreeMap::new();
        for &(column, kind) in &COVARIATE_SCHEMA {
            let values = records.iter().filter_map(|r| r.covariates.get(column));
            match kind {
                CovariateKind::Numeric => {
                    if let Some(stats) =
                        DescriptiveStats::new(values.filter_map(CovariateValue::as_numeric))
                    {
                        numeric.insert(column.to_owned(), stats);
                    }
                }
                CovariateKind::Categorical => {
                    let mut counts = BTreeMap::<String, usize>::new();
                    for level in values.filter_map(CovariateValue::as_categorical) {
                        *counts.entry(level.to_owned()).or_default() += 1;
                    }
                    if !counts.is_empty() {
                        categorical.insert(column.to_owned(), counts);
                    }
                }
            }
        }

        Self {
            records: records.len(),
            duplicates_removed,
            events: records.iter().filter(|r| r.event).count(),
            event_rate: event_rate(records),
            duration: DescriptiveStats::new(records.iter().map(|r| r.duration)),
            numeric,
            categorical,
        }
    }
}
