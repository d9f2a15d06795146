//! Response payloads
//!
//! Every payload is built by date lookup into the original input frame, so
//! values are always in original units. Record keys use the caller's column
//! names (`Date`, `Open`, ...), dates are rendered as `%Y-%m-%d`.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::DetectError;
use crate::ingest::FEATURE_COLUMNS;
use crate::scoring::ScoredPoint;
use crate::table::{Frame, intersect_index};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One input row in original units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: f64,
}

/// Anomalous row projected onto date and close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentRecord {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Close")]
    pub close: f64,
}

impl From<&BarRecord> for RecentRecord {
    fn from(bar: &BarRecord) -> Self {
        Self {
            date: bar.date.clone(),
            close: bar.close,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Percentages {
    pub anomalies: f64,
    pub normal: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PieSummary {
    pub total_points: usize,
    pub anomalies: usize,
    pub percentages: Percentages,
}

impl PieSummary {
    /// Counts over `total` input rows, `anomalies` of them flagged
    pub fn new(total: usize, anomalies: usize) -> Self {
        let divisor = total.max(1) as f64;
        Self {
            total_points: total,
            anomalies,
            percentages: Percentages {
                anomalies: round2(100.0 * anomalies as f64 / divisor),
                normal: round2(100.0 * total.saturating_sub(anomalies) as f64 / divisor),
            },
        }
    }
}

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The four payloads of a successful run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Payloads {
    pub anomalies: Vec<BarRecord>,
    pub eda: Vec<BarRecord>,
    pub recent: Vec<RecentRecord>,
    pub pie: PieSummary,
}

impl Payloads {
    pub fn anomalies_count(&self) -> usize {
        self.anomalies.len()
    }

    pub fn into_response(self) -> DetectionResponse {
        let anomalies_count = self.anomalies_count();
        DetectionResponse::Success {
            anomalies: self.anomalies,
            eda: self.eda,
            recent: self.recent,
            pie: self.pie,
            anomalies_count,
        }
    }
}

/// Build payloads by joining scored points back to `original` by date.
///
/// With no scored points the pie is all zeros while `eda` still echoes the
/// whole input.
pub fn build_payloads(original: &Frame, points: &[ScoredPoint]) -> Result<Payloads, DetectError> {
    let eda = (0..original.len())
        .map(|pos| record_at(original, pos))
        .collect::<Result<Vec<_>, _>>()?;

    if points.is_empty() {
        return Ok(Payloads {
            anomalies: Vec::new(),
            eda,
            recent: Vec::new(),
            pie: PieSummary::new(0, 0),
        });
    }

    let point_dates: Vec<_> = points.iter().map(|p| p.date).collect();
    let anomalies: Vec<BarRecord> = intersect_index(original.index(), &point_dates)
        .into_iter()
        .filter(|&(_, p)| points[p].is_anomaly())
        .map(|(pos, _)| eda[pos].clone())
        .collect();
    let recent = anomalies.iter().map(RecentRecord::from).collect();
    let pie = PieSummary::new(original.len(), anomalies.len());

    Ok(Payloads {
        anomalies,
        eda,
        recent,
        pie,
    })
}

fn record_at(frame: &Frame, pos: usize) -> Result<BarRecord, DetectError> {
    let mut values = [0.0f64; 5];
    for (slot, name) in values.iter_mut().zip(FEATURE_COLUMNS) {
        *slot = frame
            .value(pos, name)
            .ok_or_else(|| DetectError::schema(format!("input has no {} column", name)))?;
    }

    Ok(BarRecord {
        date: frame.index()[pos].format(DATE_FORMAT).to_string(),
        open: values[0],
        high: values[1],
        low: values[2],
        close: values[3],
        volume: values[4],
    })
}

/// Structured result handed back across the invocation boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DetectionResponse {
    Success {
        anomalies: Vec<BarRecord>,
        eda: Vec<BarRecord>,
        recent: Vec<RecentRecord>,
        pie: PieSummary,
        anomalies_count: usize,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        missing: Option<Vec<String>>,
    },
}

impl DetectionResponse {
    pub fn from_error(err: &DetectError) -> Self {
        let missing = match err {
            DetectError::MissingColumns(cols) => Some(cols.clone()),
            _ => None,
        };
        Self::Error {
            message: err.to_string(),
            missing,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            error!(error = %e, "Failed to encode detection response");
            r#"{"status":"error","message":"failed to encode response"}"#.to_string()
        })
    }
}

impl From<Result<Payloads, DetectError>> for DetectionResponse {
    fn from(result: Result<Payloads, DetectError>) -> Self {
        match result {
            Ok(payloads) => payloads.into_response(),
            Err(e) => Self::from_error(&e),
        }
    }
}
