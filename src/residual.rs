//! Residuals between the scaled input and its forecast
//!
//! Residuals are computed only on dates present in both frames; rows with a
//! non-finite value are dropped before they reach the residual scaler.

use tracing::debug;

use crate::error::DetectError;
use crate::models::FittedScaler;
use crate::scaler::scale_frame;
use crate::table::{Frame, intersect_index};

/// `actual - forecast` on the common dates of both frames
pub fn compute_residuals(actual: &Frame, forecast: &Frame) -> Result<Frame, DetectError> {
    let forecast = forecast.select(actual.columns()).map_err(|e| {
        DetectError::inference(format!("forecast columns differ from input: {}", e))
    })?;

    let pairs = intersect_index(actual.index(), forecast.index());
    let mut index = Vec::with_capacity(pairs.len());
    let mut rows = Vec::with_capacity(pairs.len());
    for (a, f) in pairs {
        index.push(actual.index()[a]);
        rows.push(
            actual.rows()[a]
                .iter()
                .zip(forecast.rows()[f].iter())
                .map(|(x, y)| x - y)
                .collect(),
        );
    }

    let residuals = Frame::new(index, actual.columns().to_vec(), rows)?;
    let (clean, dropped) = residuals.drop_non_finite();
    if dropped > 0 {
        debug!(dropped, kept = clean.len(), "Dropped non-finite residual rows");
    }
    Ok(clean)
}

/// Apply the residual scaler, reordering columns to its fit order
pub fn scale_residuals(
    residuals: &Frame,
    scaler: &dyn FittedScaler,
) -> Result<Frame, DetectError> {
    scale_frame(residuals, scaler)
}
