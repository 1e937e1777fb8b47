//! Turning named covariates into numeric feature vectors.
//!
//! Numeric covariates pass through unchanged. Categorical covariates are
//! one-hot encoded; the alphabetically first level seen during fitting is the
//! reference level and gets no column of its own, so a model's coefficients
//! for that column read as "relative to the reference".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::record::{COVARIATE_SCHEMA, CovariateKind, CovariateValue, Covariates, SurvivalRecord};

/// Error returned when covariates cannot be encoded.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum EncodeError {
    #[display("cannot fit an encoder without records")]
    NoRecords,
    #[display("covariate '{column}' is missing")]
    MissingCovariate { column: String },
    #[display("covariate '{column}' must be {expected}, got '{value}'")]
    WrongKind {
        column: String,
        expected: CovariateKind,
        value: String,
    },
    #[display("covariate '{column}' has level '{level}' which was not seen in training")]
    UnknownLevel { column: String, level: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EncodedColumn {
    Numeric {
        name: String,
    },
    Categorical {
        name: String,
        reference: String,
        levels: Vec<String>,
    },
}

impl EncodedColumn {
    fn name(&self) -> &str {
        match self {
            Self::Numeric { name } | Self::Categorical { name, .. } => name,
        }
    }

    fn width(&self) -> usize {
        match self {
            Self::Numeric { .. } => 1,
            Self::Categorical { levels, .. } => levels.len(),
        }
    }
}

/// One-hot/pass-through encoder fitted on training records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    columns: Vec<EncodedColumn>,
}

impl FeatureEncoder {
    /// Fits an encoder for the turnover covariate schema.
    pub fn fit(records: &[SurvivalRecord]) -> Result<Self, EncodeError> {
        Self::fit_with_schema(records, &COVARIATE_SCHEMA)
    }

    /// Fits an encoder for an explicit list of `(column, kind)` pairs.
    pub fn fit_with_schema(
        records: &[SurvivalRecord],
        schema: &[(&str, CovariateKind)],
    ) -> Result<Self, EncodeError> {
        if records.is_empty() {
            return Err(EncodeError::NoRecords);
        }

        let mut columns = vec![];
        for &(name, kind) in schema {
            match kind {
                CovariateKind::Numeric => {
                    for record in records {
                        numeric_value(&record.covariates, name)?;
                    }
                    columns.push(EncodedColumn::Numeric {
                        name: name.to_owned(),
                    });
                }
                CovariateKind::Categorical => {
                    let mut levels = BTreeSet::new();
                    for record in records {
                        levels.insert(categorical_value(&record.covariates, name)?);
                    }
                    let mut levels = levels.into_iter().map(str::to_owned);
                    let reference = levels.next().unwrap_or_default();
                    columns.push(EncodedColumn::Categorical {
                        name: name.to_owned(),
                        reference,
                        levels: levels.collect(),
                    });
                }
            }
        }

        let encoder = Self { columns };
        log::debug!(
            "Fitted feature encoder: {} covariates -> {} features",
            encoder.columns.len(),
            encoder.n_features()
        );
        Ok(encoder)
    }

    /// Number of numeric features produced by [`encode`](Self::encode).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.columns.iter().map(EncodedColumn::width).sum()
    }

    /// Names of the encoded features: `column` for numeric covariates and
    /// `column=level` for each non-reference categorical level.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![];
        for column in &self.columns {
            match column {
                EncodedColumn::Numeric { name } => names.push(name.clone()),
                EncodedColumn::Categorical { name, levels, .. } => {
                    names.extend(levels.iter().map(|level| format!("{name}={level}")));
                }
            }
        }
        names
    }

    /// All levels of a categorical column (reference first), or `None` for
    /// numeric and unknown columns.
    #[must_use]
    pub fn levels(&self, column: &str) -> Option<Vec<&str>> {
        self.columns.iter().find_map(|c| match c {
            EncodedColumn::Categorical {
                name,
                reference,
                levels,
            } if name == column => Some(
                std::iter::once(reference.as_str())
                    .chain(levels.iter().map(String::as_str))
                    .collect(),
            ),
            _ => None,
        })
    }

    /// Names of the covariates this encoder reads.
    pub fn covariate_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(EncodedColumn::name)
    }

    /// Encodes one subject's covariates.
    pub fn encode(&self, covariates: &Covariates) -> Result<Vec<f64>, EncodeError> {
        let mut features = Vec::with_capacity(self.n_features());
        for column in &self.columns {
            match column {
                EncodedColumn::Numeric { name } => {
                    features.push(numeric_value(covariates, name)?);
                }
                EncodedColumn::Categorical {
                    name,
                    reference,
                    levels,
                } => {
                    let value = categorical_value(covariates, name)?;
                    if value != reference && !levels.iter().any(|l| l == value) {
                        return Err(EncodeError::UnknownLevel {
                            column: name.clone(),
                            level: value.to_owned(),
                        });
                    }
                    features.extend(levels.iter().map(|l| if l == value { 1.0 } else { 0.0 }));
                }
            }
        }
        Ok(features)
    }

    /// Encodes every record, in order.
    pub fn encode_all(&self, records: &[SurvivalRecord]) -> Result<Vec<Vec<f64>>, EncodeError> {
        records.iter().map(|r| self.encode(&r.covariates)).collect()
    }
}

fn covariate<'a>(covariates: &'a Covariates, name: &str) -> Result<&'a CovariateValue, EncodeError> {
    covariates
        .get(name)
        .ok_or_else(|| EncodeError::MissingCovariate {
            column: name.to_owned(),
        })
}

fn numeric_value(covariates: &Covariates, name: &str) -> Result<f64, EncodeError> {
    let value = covariate(covariates, name)?;
    value.as_numeric().ok_or_else(|| EncodeError::WrongKind {
        column: name.to_owned(),
        expected: CovariateKind::Numeric,
        value: value.to_string(),
    })
}

fn categorical_value<'a>(covariates: &'a Covariates, name: &str) -> Result<&'a str, EncodeError> {
    let value = covariate(covariates, name)?;
    value.as_categorical().ok_or_else(|| EncodeError::WrongKind {
        column: name.to_owned(),
        expected: CovariateKind::Categorical,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: [(&str, CovariateKind); 2] = [
        ("coach", CovariateKind::Categorical),
        ("age", CovariateKind::Numeric),
    ];

    fn record(coach: &str, age: f64) -> SurvivalRecord {
        SurvivalRecord {
            duration: 1.0,
            event: true,
            covariates: Covariates::from([
                ("coach", CovariateValue::Categorical(coach.to_owned())),
                ("age", CovariateValue::Numeric(age)),
            ]),
        }
    }

    fn encoder() -> FeatureEncoder {
        let records = [record("no", 30.0), record("yes", 25.0), record("my head", 41.0)];
        FeatureEncoder::fit_with_schema(&records, &SCHEMA).unwrap()
    }

    #[test]
    fn test_reference_level_dropped() {
        let encoder = encoder();
        assert_eq!(encoder.n_features(), 3);
        assert_eq!(encoder.feature_names(), vec!["coach=no", "coach=yes", "age"]);
        assert_eq!(encoder.levels("coach"), Some(vec!["my head", "no", "yes"]));
        assert_eq!(encoder.levels("age"), None);
    }

    #[test]
    fn test_encode() {
        let encoder = encoder();
        assert_eq!(
            encoder.encode(&record("my head", 30.0).covariates),
            Ok(vec![0.0, 0.0, 30.0])
        );
        assert_eq!(
            encoder.encode(&record("yes", 22.5).covariates),
            Ok(vec![0.0, 1.0, 22.5])
        );
    }

    #[test]
    fn test_unknown_level() {
        let err = encoder().encode(&record("mentor", 30.0).covariates).unwrap_err();
        assert_eq!(
            err,
            EncodeError::UnknownLevel {
                column: "coach".to_owned(),
                level: "mentor".to_owned()
            }
        );
    }

    #[test]
    fn test_missing_and_wrong_kind() {
        let encoder = encoder();
        let missing = Covariates::from([("coach", CovariateValue::Categorical("no".to_owned()))]);
        assert!(matches!(
            encoder.encode(&missing),
            Err(EncodeError::MissingCovariate { .. })
        ));

        let wrong = Covariates::from([
            ("coach", CovariateValue::Numeric(1.0)),
            ("age", CovariateValue::Numeric(30.0)),
        ]);
        assert!(matches!(
            encoder.encode(&wrong),
            Err(EncodeError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_serde_round_trip() {
        let encoder = encoder();
        let json = serde_json::to_string(&encoder).unwrap();
        let restored: FeatureEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, encoder);
    }

    #[test]
    fn test_fit_requires_records() {
        assert_eq!(
            FeatureEncoder::fit_with_schema(&[], &SCHEMA),
            Err(EncodeError::NoRecords)
        );
    }
}
