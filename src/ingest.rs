//! CSV ingest for daily OHLCV bars.
//!
//! Turns caller-supplied CSV text into the canonical input `Frame`:
//! - extra columns are dropped, column order is normalized
//! - missing required columns are reported all at once
//! - dates are parsed from any of the common formats
//! - rows are ordered by date; duplicate dates are rejected

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::DetectError;
use crate::table::Frame;

pub const DATE_COLUMN: &str = "Date";

/// Required input columns, in the order missing ones are reported
pub const REQUIRED_COLUMNS: [&str; 6] = ["Date", "Close", "High", "Low", "Open", "Volume"];

/// Numeric columns of the canonical input frame, in frame order
pub const FEATURE_COLUMNS: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// One already-parsed daily bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    fn values(&self) -> Vec<f64> {
        vec![self.open, self.high, self.low, self.close, self.volume]
    }
}

pub fn feature_columns() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Parse a date string in any supported format.
///
/// Datetimes are accepted and truncated to their calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    None
}

/// Parse CSV text into the canonical input frame.
pub fn parse_csv(text: &str) -> Result<Frame, DetectError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !header_map.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DetectError::MissingColumns(missing));
    }

    let date_col = header_map[DATE_COLUMN];
    let feature_cols: Vec<usize> = FEATURE_COLUMNS.iter().map(|c| header_map[*c]).collect();

    let mut bars = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // header is line 1
        let line = idx + 2;
        let record = result?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        bars.push(parse_record(&record, line, date_col, &feature_cols)?);
    }

    debug!(rows = bars.len(), columns = headers.len(), "Parsed CSV input");
    from_bars(bars)
}

/// Build the canonical input frame from already-parsed bars.
///
/// Bars may arrive in any order; duplicate dates are rejected.
pub fn from_bars(mut bars: Vec<Bar>) -> Result<Frame, DetectError> {
    if bars.windows(2).any(|w| w[0].date > w[1].date) {
        warn!(rows = bars.len(), "Input dates out of order, sorting by date");
        bars.sort_by_key(|b| b.date);
    }
    if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(DetectError::schema(format!(
            "duplicate date {}",
            pair[0].date
        )));
    }

    let index = bars.iter().map(|b| b.date).collect();
    let rows = bars.iter().map(Bar::values).collect();
    Frame::new(index, feature_columns(), rows)
}

fn parse_record(
    record: &StringRecord,
    line: usize,
    date_col: usize,
    feature_cols: &[usize],
) -> Result<Bar, DetectError> {
    let raw_date = record.get(date_col).unwrap_or("");
    let date = parse_date(raw_date).ok_or_else(|| {
        DetectError::schema(format!(
            "line {}: unparsable {} value '{}'",
            line, DATE_COLUMN, raw_date
        ))
    })?;

    let mut values = [0.0f64; 5];
    for (slot, (&col, name)) in values
        .iter_mut()
        .zip(feature_cols.iter().zip(FEATURE_COLUMNS.iter()))
    {
        let raw = record.get(col).unwrap_or("");
        *slot = raw.parse::<f64>().map_err(|_| {
            DetectError::schema(format!("line {}: invalid {} value '{}'", line, name, raw))
        })?;
    }

    Ok(Bar {
        date,
        open: values[0],
        high: values[1],
        low: values[2],
        close: values[3],
        volume: values[4],
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // spreadsheet exports prefix the first header with a BOM
        let name = name.trim().trim_start_matches('\u{feff}').to_string();
        map.entry(name).or_insert(idx);
    }
    map
}
