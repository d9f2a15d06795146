//! Forecast alignment
//!
//! Turns the forecaster's raw output into a frame that shares the scaled
//! input's date index. The first `k` input rows are consumed as seed state, so
//! forecasts always cover input positions `[k, N)`.

use tracing::debug;

use crate::config::ForecastAnchor;
use crate::error::DetectError;
use crate::models::Forecaster;
use crate::table::Frame;

/// Produce the forecast frame for `scaled`, indexed by `scaled.index()[k..]`.
pub fn forecast_frame(
    scaled: &Frame,
    forecaster: &dyn Forecaster,
    anchor: ForecastAnchor,
) -> Result<Frame, DetectError> {
    let k = forecaster.order();
    let n = scaled.len();
    if n < k {
        return Err(DetectError::InsufficientHistory {
            stage: "forecast",
            required: k,
            available: n,
        });
    }

    let rows = match anchor {
        ForecastAnchor::Tail => tail_forecast(scaled, forecaster, k)?,
        ForecastAnchor::Rolling { every } => rolling_forecast(scaled, forecaster, k, every.max(1))?,
    };

    let width = scaled.width();
    if let Some(row) = rows.iter().find(|r| r.len() != width) {
        return Err(DetectError::inference(format!(
            "forecast rows have {} values, expected {}",
            row.len(),
            width
        )));
    }

    debug!(order = k, rows = rows.len(), ?anchor, "Forecast aligned");
    Frame::new(scaled.index()[k..].to_vec(), scaled.columns().to_vec(), rows)
}

/// Seed once from the last `k` rows and keep the first `n - k` steps
fn tail_forecast(
    scaled: &Frame,
    forecaster: &dyn Forecaster,
    k: usize,
) -> Result<Vec<Vec<f64>>, DetectError> {
    let n = scaled.len();
    let mut predicted = forecaster.forecast(&scaled.rows()[n - k..], n)?;
    if predicted.len() < n - k {
        return Err(DetectError::inference(format!(
            "forecaster returned {} steps, expected {}",
            predicted.len(),
            n
        )));
    }
    predicted.truncate(n - k);
    Ok(predicted)
}

/// Forecast blocks of `every` rows, each seeded from the actual preceding `k` rows
fn rolling_forecast(
    scaled: &Frame,
    forecaster: &dyn Forecaster,
    k: usize,
    every: usize,
) -> Result<Vec<Vec<f64>>, DetectError> {
    let n = scaled.len();
    let mut rows = Vec::with_capacity(n - k);
    let mut pos = k;

    while pos < n {
        let steps = every.min(n - pos);
        let block = forecaster.forecast(&scaled.rows()[pos - k..pos], steps)?;
        if block.len() < steps {
            return Err(DetectError::inference(format!(
                "forecaster returned {} steps, expected {}",
                block.len(),
                steps
            )));
        }
        rows.extend(block.into_iter().take(steps));
        pos += steps;
    }

    Ok(rows)
}
