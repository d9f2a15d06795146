//! Fitted affine scalers and the frame-level scaler adapter.

use serde::{Deserialize, Serialize};

use crate::error::DetectError;
use crate::models::FittedScaler;
use crate::table::Frame;

/// Per-column affine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffineParams {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { scale: Vec<f64>, min: Vec<f64> },
}

/// Pre-fitted scaler artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineScaler {
    pub feature_names: Vec<String>,
    pub params: AffineParams,
}

impl AffineScaler {
    pub fn standard(feature_names: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            feature_names,
            params: AffineParams::Standard { mean, scale },
        }
    }

    pub fn min_max(feature_names: Vec<String>, scale: Vec<f64>, min: Vec<f64>) -> Self {
        Self {
            feature_names,
            params: AffineParams::MinMax { scale, min },
        }
    }

    /// Check parameter widths and finiteness
    pub fn validate(&self) -> Result<(), String> {
        let width = self.feature_names.len();
        if width == 0 {
            return Err("scaler has no fitted columns".to_string());
        }
        for (i, name) in self.feature_names.iter().enumerate() {
            if self.feature_names[..i].contains(name) {
                return Err(format!("fitted column {:?} appears more than once", name));
            }
        }

        let (a, b) = match &self.params {
            AffineParams::Standard { mean, scale } => (mean, scale),
            AffineParams::MinMax { scale, min } => (scale, min),
        };
        if a.len() != width || b.len() != width {
            return Err(format!(
                "parameter width {}/{} does not match {} fitted columns",
                a.len(),
                b.len(),
                width
            ));
        }
        if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".to_string());
        }

        Ok(())
    }
}

impl FittedScaler for AffineScaler {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        match &self.params {
            AffineParams::Standard { mean, scale } => row
                .iter()
                .zip(mean.iter().zip(scale.iter()))
                .map(|(x, (m, s))| {
                    // constant columns were fitted with zero spread
                    let s = if *s == 0.0 { 1.0 } else { *s };
                    (x - m) / s
                })
                .collect(),
            AffineParams::MinMax { scale, min } => row
                .iter()
                .zip(scale.iter().zip(min.iter()))
                .map(|(x, (s, m))| x * s + m)
                .collect(),
        }
    }
}

/// Scale `frame` with a fitted scaler.
///
/// Columns are reordered to the scaler's fit order; any difference in the
/// column set is a schema error. The time index is carried over unchanged.
pub fn scale_frame(frame: &Frame, scaler: &dyn FittedScaler) -> Result<Frame, DetectError> {
    let ordered = frame
        .select(scaler.feature_names())
        .map_err(|e| DetectError::schema(format!("scaler input mismatch: {}", e)))?;
    Ok(ordered.map_rows(|row| scaler.transform_row(row)))
}
