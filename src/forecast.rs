//! Time-windowed forecast lookup.
//!
//! A forecast file is a CSV table with a header line followed by
//! `start,end,value` rows, e.g.
//!
//! ```text
//! start,end,value
//! 2022-12-08T10:00,2022-12-08T11:00,150000
//! ```
//!
//! Rows are expected not to overlap. When they do, the first row in file
//! order whose interval contains the lookup instant wins.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::error::ForecastError;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// One forecast value valid over the closed interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionRow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub value: i32,
}

impl PredictionRow {
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.start <= now && now <= self.end
    }
}

fn parse_timestamp(field: &'static str, raw: &str) -> Result<NaiveDateTime, ForecastError> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| ForecastError::Timestamp {
            field,
            raw: raw.to_string(),
        })
}

fn parse_record(record: &StringRecord, allow_negative: bool) -> Result<PredictionRow, ForecastError> {
    let start_raw = record.get(0).ok_or(ForecastError::MissingField("start"))?;
    let end_raw = record.get(1).ok_or(ForecastError::MissingField("end"))?;
    let value_raw = record.get(2).ok_or(ForecastError::MissingField("value"))?;

    let start = parse_timestamp("start", start_raw)?;
    let end = parse_timestamp("end", end_raw)?;
    if end <= start {
        return Err(ForecastError::InvertedInterval {
            start: start_raw.to_string(),
            end: end_raw.to_string(),
        });
    }

    let value: i32 = value_raw.parse().map_err(|source| ForecastError::Value {
        raw: value_raw.to_string(),
        source,
    })?;
    if value < 0 && !allow_negative {
        return Err(ForecastError::NegativeValue(value));
    }

    Ok(PredictionRow { start, end, value })
}

/// Parses all valid rows from a forecast table.
///
/// The first line is a header and is skipped. Rows that cannot be parsed are
/// logged and skipped; they never abort the rest of the table.
///
/// # Arguments
///
/// * `reader` - CSV source
/// * `allow_negative` - Accept negative values (signed power forecasts)
pub fn parse_rows<R: Read>(reader: R, allow_negative: bool) -> Vec<PredictionRow> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in csv.records().enumerate() {
        let parsed = record
            .map_err(ForecastError::from)
            .and_then(|record| parse_record(&record, allow_negative));
        match parsed {
            Ok(row) => rows.push(row),
            // +2: one for the header, one for 1-based line numbers
            Err(err) => warn!(line = index + 2, error = %err, "skipping forecast row"),
        }
    }
    rows
}

/// Resolves the forecast value valid at a given instant from a CSV file.
///
/// The row found last is cached and reused while the lookup instant stays
/// inside its interval; otherwise the file is read again. A missing or
/// unreadable file means "no prediction".
#[derive(Debug, Clone)]
pub struct PredictionStore {
    path: PathBuf,
    allow_negative: bool,
    cached: Option<PredictionRow>,
}

impl PredictionStore {
    /// Store for non-negative values such as a minimum energy reserve.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            allow_negative: false,
            cached: None,
        }
    }

    /// Store for signed values such as a grid power set-point.
    pub fn signed(path: impl Into<PathBuf>) -> Self {
        Self {
            allow_negative: true,
            ..Self::new(path)
        }
    }

    pub fn cached(&self) -> Option<&PredictionRow> {
        self.cached.as_ref()
    }

    /// Value valid at `now`, if any row covers it.
    pub fn lookup(&mut self, now: NaiveDateTime) -> Option<i32> {
        if let Some(row) = self.cached.filter(|row| row.contains(now)) {
            return Some(row.value);
        }

        self.cached = self
            .read_rows()
            .into_iter()
            .find(|row| row.contains(now));
        match self.cached {
            Some(row) => debug!(path = %self.path.display(), start = %row.start, end = %row.end, value = row.value, "forecast row resolved"),
            None => debug!(path = %self.path.display(), %now, "no forecast row covers this instant"),
        }
        self.cached.map(|row| row.value)
    }

    fn read_rows(&self) -> Vec<PredictionRow> {
        match File::open(&self.path) {
            Ok(file) => parse_rows(file, self.allow_negative),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "forecast file not found, no prediction available");
                Vec::new()
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cannot read forecast file");
                Vec::new()
            }
        }
    }
}
