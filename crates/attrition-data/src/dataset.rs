//! Loading the employee turnover table from CSV.
//!
//! The table must have a header row with a `duration` column (alias `stag`),
//! an `event` column holding 0/1, and every column of
//! [`COVARIATE_SCHEMA`](crate::record::COVARIATE_SCHEMA) (`transport` may be
//! spelled `way`). Extra columns are ignored.
//!
//! Rows whose text is identical to an earlier row are dropped before parsing.

use std::{
    collections::HashSet,
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use crate::record::{
    COVARIATE_SCHEMA, CovariateKind, CovariateValue, Covariates, SurvivalRecord,
};

const DURATION_COLUMNS: &[&str] = &["duration", "stag"];
const EVENT_COLUMNS: &[&str] = &["event"];

/// Error returned when a dataset cannot be loaded.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DatasetError {
    #[display("failed to open dataset {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[display("failed to read CSV: {_0}")]
    Csv(#[error(source)] csv::Error),
    #[display("dataset is missing required column '{column}'")]
    MissingColumn { column: &'static str },
    #[display("line {line}: invalid value '{value}' in column '{column}' ({reason})")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
        reason: &'static str,
    },
    #[display("dataset contains no records")]
    Empty,
}

/// A deduplicated, validated set of survival records.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<SurvivalRecord>,
    /// Number of exact duplicate rows dropped while loading.
    pub duplicates_removed: usize,
}

impl Dataset {
    /// Loads a dataset from a CSV file.
    pub fn from_csv_path<P>(path: P) -> Result<Self, DatasetError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_owned(),
            source,
        })?;
        let dataset = Self::from_reader(file)?;
        log::info!(
            "Loaded {} records from {} ({} duplicates removed)",
            dataset.records.len(),
            path.display(),
            dataset.duplicates_removed
        );
        Ok(dataset)
    }

    /// Loads a dataset from any CSV source.
    pub fn from_reader<R>(reader: R) -> Result<Self, DatasetError>
    where
        R: Read,
    {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers().map_err(DatasetError::Csv)?.clone();
        let layout = ColumnLayout::from_headers(&headers)?;

        let mut seen = HashSet::new();
        let mut duplicates_removed = 0;
        let mut records = vec![];
        for row in reader.records() {
            let row = row.map_err(DatasetError::Csv)?;
            let key = row.iter().map(str::to_owned).collect::<Vec<_>>();
            if !seen.insert(key) {
                duplicates_removed += 1;
                continue;
            }
            records.push(layout.parse_row(&row)?);
        }

        if records.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            records,
            duplicates_removed,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Column positions resolved from the header row.
struct ColumnLayout {
    duration: usize,
    event: usize,
    covariates: Vec<(&'static str, CovariateKind, usize)>,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, DatasetError> {
        let find = |names: &[&str]| find_column(headers, names);

        let duration = find(DURATION_COLUMNS).ok_or(DatasetError::MissingColumn {
            column: DURATION_COLUMNS[0],
        })?;
        let event = find(EVENT_COLUMNS).ok_or(DatasetError::MissingColumn {
            column: EVENT_COLUMNS[0],
        })?;
        let covariates = COVARIATE_SCHEMA
            .iter()
            .map(|&(name, kind)| {
                let index = match name {
                    "transport" => find(&["transport", "way"][..]),
                    _ => find(&[name][..]),
                };
                index
                    .map(|index| (name, kind, index))
                    .ok_or(DatasetError::MissingColumn { column: name })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            duration,
            event,
            covariates,
        })
    }

    fn parse_row(&self, row: &csv::StringRecord) -> Result<SurvivalRecord, DatasetError> {
        let line = row.position().map_or(0, csv::Position::line);
        let field = |index: usize| row.get(index).unwrap_or("");
        let invalid = |column, value: &str, reason| DatasetError::InvalidValue {
            line,
            column,
            value: value.to_owned(),
            reason,
        };

        let duration_text = field(self.duration);
        let duration = duration_text
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| {
                invalid(
                    DURATION_COLUMNS[0],
                    duration_text,
                    "expected a non-negative number",
                )
            })?;

        let event_text = field(self.event);
        let event = match event_text.parse::<f64>() {
            Ok(v) if v == 0.0 => false,
            Ok(v) if v == 1.0 => true,
            _ => return Err(invalid(EVENT_COLUMNS[0], event_text, "expected 0 or 1")),
        };

        let mut covariates = Covariates::new();
        for &(name, kind, index) in &self.covariates {
            let text = field(index);
            let value = CovariateValue::parse(kind, text)
                .map_err(|_| invalid(name, text, "expected a number"))?;
            covariates.insert(name, value);
        }

        Ok(SurvivalRecord {
            duration,
            event,
            covariates,
        })
    }
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h))
}
