//! Score tables: Brier estimates over an increasing time grid.

use std::{
    fs::File,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::interval::{BrierEstimate, IntervalParseError};

/// One evaluation time of a score table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub time: f64,
    pub brier: BrierEstimate,
}

/// Error returned when a score table is malformed or cannot be read or written.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TableError {
    #[display("score table row {index} has invalid time {time}")]
    InvalidTime { index: usize, time: f64 },
    #[display("score table times must be strictly increasing, but row {index} has {current} after {previous}")]
    NonIncreasingTime {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[display("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[display("failed to access score table CSV: {_0}")]
    Csv(#[error(source)] csv::Error),
    #[display("line {line}: {source}")]
    Estimate {
        line: u64,
        source: IntervalParseError,
    },
}

/// Brier estimates sorted by strictly increasing time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreTable {
    rows: Vec<ScoreRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    time: f64,
    brier: String,
}

impl ScoreTable {
    /// Builds a table, checking that times are finite, non-negative and
    /// strictly increasing.
    pub fn new(rows: Vec<ScoreRow>) -> Result<Self, TableError> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| !r.time.is_finite() || r.time < 0.0)
        {
            return Err(TableError::InvalidTime {
                index,
                time: row.time,
            });
        }
        if let Some(index) = rows.windows(2).position(|w| w[1].time <= w[0].time) {
            return Err(TableError::NonIncreasingTime {
                index: index + 1,
                previous: rows[index].time,
                current: rows[index + 1].time,
            });
        }
        Ok(Self { rows })
    }

    /// Wraps rows whose times were already validated by the caller.
    pub(crate) fn from_checked_rows(rows: Vec<ScoreRow>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].time < w[1].time));
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Last evaluation time, if any.
    #[must_use]
    pub fn max_time(&self) -> Option<f64> {
        self.rows.last().map(|r| r.time)
    }

    /// `(time, point estimate)` pairs, the curve integrated into the IBS.
    #[must_use]
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.rows.iter().map(|r| (r.time, r.brier.point)).collect()
    }

    /// Reads a `time,brier` CSV file.
    pub fn read_csv_path<P>(path: P) -> Result<Self, TableError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TableError::Open {
            path: path.to_owned(),
            source,
        })?;
        Self::read_csv(file)
    }

    /// Reads `time,brier` CSV rows where `brier` is `point [low;high]`.
    pub fn read_csv<R>(reader: R) -> Result<Self, TableError>
    where
        R: Read,
    {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers().map_err(TableError::Csv)?.clone();
        let mut rows = vec![];
        for record in reader.records() {
            let record = record.map_err(TableError::Csv)?;
            let line = record.position().map_or(0, csv::Position::line);
            let row: CsvRow = record.deserialize(Some(&headers)).map_err(TableError::Csv)?;
            let brier = row
                .brier
                .parse()
                .map_err(|source| TableError::Estimate { line, source })?;
            rows.push(ScoreRow {
                time: row.time,
                brier,
            });
        }
        Self::new(rows)
    }

    /// Writes the table as `time,brier` CSV.
    ///
    /// Estimates are written at full precision so that reading the file back
    /// yields the same points.
    pub fn write_csv<W>(&self, writer: W) -> Result<(), TableError>
    where
        W: Write,
    {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer
                .serialize(CsvRow {
                    time: row.time,
                    brier: row.brier.to_string(),
                })
                .map_err(TableError::Csv)?;
        }
        writer
            .flush()
            .map_err(|e| TableError::Csv(csv::Error::from(e)))?;
        Ok(())
    }

    pub fn write_csv_path<P>(&self, path: P) -> Result<(), TableError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| TableError::Open {
            path: path.to_owned(),
            source,
        })?;
        self.write_csv(file)
    }
}
