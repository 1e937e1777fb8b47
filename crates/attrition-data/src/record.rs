//! Survival records and their covariates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a covariate column is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum CovariateKind {
    /// Free-text levels, one-hot encoded for modelling.
    #[display("categorical")]
    Categorical,
    /// Ordinal or continuous numbers, used as-is.
    #[display("numeric")]
    Numeric,
}

/// Covariate columns of the employee turnover dataset, in encoding order.
pub const COVARIATE_SCHEMA: [(&str, CovariateKind); 14] = [
    ("gender", CovariateKind::Categorical),
    ("age", CovariateKind::Numeric),
    ("industry", CovariateKind::Categorical),
    ("profession", CovariateKind::Categorical),
    ("traffic", CovariateKind::Categorical),
    ("coach", CovariateKind::Categorical),
    ("head_gender", CovariateKind::Categorical),
    ("greywage", CovariateKind::Categorical),
    ("transport", CovariateKind::Categorical),
    ("extraversion", CovariateKind::Numeric),
    ("independ", CovariateKind::Numeric),
    ("selfcontrol", CovariateKind::Numeric),
    ("anxiety", CovariateKind::Numeric),
    ("novator", CovariateKind::Numeric),
];

impl CovariateKind {
    /// Looks up the kind of a covariate column in [`COVARIATE_SCHEMA`].
    #[must_use]
    pub fn of(column: &str) -> Option<Self> {
        COVARIATE_SCHEMA
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, kind)| *kind)
    }
}

/// Error returned when covariate text does not match the column kind.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
#[display("'{text}' is not a valid {kind} value")]
pub struct CovariateParseError {
    pub text: String,
    pub kind: CovariateKind,
}

/// A single covariate value.
///
/// Serialized untagged, so a JSON profile can mix numbers and strings:
/// `{"age": 31.0, "coach": "my head"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[serde(untagged)]
pub enum CovariateValue {
    #[display("{_0}")]
    Numeric(f64),
    #[display("{_0}")]
    Categorical(String),
}

impl CovariateValue {
    /// Parses text as a value of the given kind.
    pub fn parse(kind: CovariateKind, text: &str) -> Result<Self, CovariateParseError> {
        let text = text.trim();
        match kind {
            CovariateKind::Categorical => Ok(Self::Categorical(text.to_owned())),
            CovariateKind::Numeric => text
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Numeric)
                .ok_or_else(|| CovariateParseError {
                    text: text.to_owned(),
                    kind,
                }),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CovariateKind {
        match self {
            Self::Numeric(_) => CovariateKind::Numeric,
            Self::Categorical(_) => CovariateKind::Categorical,
        }
    }

    #[must_use]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Categorical(_) => None,
        }
    }

    #[must_use]
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Self::Numeric(_) => None,
            Self::Categorical(s) => Some(s),
        }
    }
}

/// Named covariates of one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Covariates(BTreeMap<String, CovariateValue>);

impl Covariates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CovariateValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: CovariateValue) {
        self.0.insert(name.into(), value);
    }

    /// Returns a copy with one covariate replaced.
    ///
    /// Used to ask "what if" questions of a fitted model while holding all
    /// other covariates fixed.
    #[must_use]
    pub fn with(&self, name: impl Into<String>, value: CovariateValue) -> Self {
        let mut copy = self.clone();
        copy.insert(name, value);
        copy
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CovariateValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, const N: usize> From<[(K, CovariateValue); N]> for Covariates
where
    K: Into<String>,
{
    fn from(values: [(K, CovariateValue); N]) -> Self {
        Self(values.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// One subject of a survival dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalRecord {
    /// Elapsed time until the event or censoring, in months.
    pub duration: f64,
    /// `true` if the employee quit (event observed), `false` if censored.
    pub event: bool,
    pub covariates: Covariates,
}

impl SurvivalRecord {
    /// Returns the `(time, event)` pair used by survival estimators.
    #[must_use]
    pub fn observation(&self) -> (f64, bool) {
        (self.duration, self.event)
    }
}

/// Fraction of records whose event was observed.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn event_rate(records: &[SurvivalRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().filter(|r| r.event).count() as f64 / records.len() as f64
}
