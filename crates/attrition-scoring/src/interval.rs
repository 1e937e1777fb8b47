//! Point estimates with confidence intervals and their text form.
//!
//! Score tables export each Brier value as `point [low;high]`. Downstream
//! numeric work only needs the point, which
//! [`strip_confidence_interval`] recovers by splitting on the first
//! delimiter instead of counting characters, so any number of digits works.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Error returned when an estimate string cannot be parsed.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum IntervalParseError {
    #[display("estimate string is empty")]
    Empty,
    #[display("'{text}' is not a finite number")]
    InvalidNumber { text: String },
    #[display("malformed confidence interval '{text}', expected '[low;high]'")]
    MalformedInterval { text: String },
}

/// Extracts the point estimate from a `"<point> [<low>;<high>]"` string.
///
/// The input is trimmed and the prefix up to the first whitespace or `[` is
/// parsed as a number. Anything after the prefix is ignored, so a bare number
/// is accepted as well.
///
/// # Examples
///
/// ```
/// use attrition_scoring::interval::strip_confidence_interval;
///
/// assert_eq!(strip_confidence_interval("0.123 [0.100;0.150]").unwrap(), 0.123);
/// assert_eq!(strip_confidence_interval(".85 [.80;.90]").unwrap(), 0.85);
/// assert_eq!(strip_confidence_interval("0.5").unwrap(), 0.5);
/// assert!(strip_confidence_interval("").is_err());
/// ```
pub fn strip_confidence_interval(text: &str) -> Result<f64, IntervalParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(IntervalParseError::Empty);
    }
    let end = text
        .find(|c: char| c.is_whitespace() || c == '[')
        .unwrap_or(text.len());
    parse_number(&text[..end])
}

fn parse_number(text: &str) -> Result<f64, IntervalParseError> {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(IntervalParseError::InvalidNumber {
            text: text.to_owned(),
        }),
    }
}

/// A Brier score with its bootstrap confidence interval.
///
/// Invariant: `low <= point <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrierEstimate {
    pub point: f64,
    pub low: f64,
    pub high: f64,
}

impl BrierEstimate {
    /// An estimate whose interval collapses to the point.
    #[must_use]
    pub fn exact(point: f64) -> Self {
        Self {
            point,
            low: point,
            high: point,
        }
    }

    /// Width of the confidence interval.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

impl fmt::Display for BrierEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { point, low, high } = self;
        match f.precision() {
            Some(p) => write!(f, "{point:.p$} [{low:.p$};{high:.p$}]"),
            None => write!(f, "{point} [{low};{high}]"),
        }
    }
}

impl FromStr for BrierEstimate {
    type Err = IntervalParseError;

    /// Parses `point`, optionally followed by `[low;high]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let point = strip_confidence_interval(s)?;
        let Some(open) = s.find('[') else {
            return Ok(Self::exact(point));
        };
        let malformed = || IntervalParseError::MalformedInterval {
            text: s.trim().to_owned(),
        };
        let inner = s[open + 1..]
            .trim_end()
            .strip_suffix(']')
            .ok_or_else(malformed)?;
        let (low, high) = inner.split_once(';').ok_or_else(malformed)?;
        let (low, high) = (parse_number(low)?, parse_number(high)?);
        if low > high {
            return Err(malformed());
        }
        Ok(Self { point, low, high })
    }
}
