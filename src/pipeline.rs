//! Detection pipeline
//!
//! Sequences the stages over one input frame:
//! raw -> scaled -> forecast -> residuals -> scaled residuals -> windows
//! -> reconstruction errors -> labels -> payloads.
//!
//! Each stage shrinks the usable date range; every join between stages goes
//! through the frames' date indexes. A run either yields all four payloads or
//! one error.

use tracing::{debug, info};

use crate::config::PipelineOptions;
use crate::error::DetectError;
use crate::forecast::forecast_frame;
use crate::payload::{Payloads, build_payloads};
use crate::registry::ModelRegistry;
use crate::residual::{compute_residuals, scale_residuals};
use crate::scaler::scale_frame;
use crate::scoring::{ScoredPoint, classify, reconstruction_errors};
use crate::table::Frame;
use crate::window::sliding_windows;

/// Row counts left after each stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageCounts {
    pub input_rows: usize,
    pub forecast_rows: usize,
    pub residual_rows: usize,
    pub windows: usize,
}

/// Everything a successful run produces
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutcome {
    pub payloads: Payloads,
    /// Scored target dates with their labels, in date order
    pub points: Vec<ScoredPoint>,
    pub counts: StageCounts,
}

impl DetectionOutcome {
    pub fn anomalies_count(&self) -> usize {
        self.payloads.anomalies_count()
    }
}

/// Run the full pipeline over the canonical input frame.
pub fn detect(
    original: &Frame,
    registry: &ModelRegistry,
    options: &PipelineOptions,
) -> Result<DetectionOutcome, DetectError> {
    let mut counts = StageCounts {
        input_rows: original.len(),
        ..Default::default()
    };

    let scaled = scale_frame(original, registry.var_scaler())?;
    let forecast = forecast_frame(&scaled, registry.forecaster(), options.forecast_anchor)?;
    counts.forecast_rows = forecast.len();

    let residuals = compute_residuals(&scaled, &forecast)?;
    let residuals = scale_residuals(&residuals, registry.residual_scaler())?;
    counts.residual_rows = residuals.len();

    let windows = sliding_windows(&residuals, options.window_len);
    counts.windows = windows.len();
    debug!(
        rows = counts.input_rows,
        forecast = counts.forecast_rows,
        residuals = counts.residual_rows,
        windows = counts.windows,
        "Stage shapes"
    );

    if windows.is_empty() {
        info!(
            rows = counts.input_rows,
            residuals = counts.residual_rows,
            window_len = options.window_len,
            "Too few residual rows for a single window, returning empty result"
        );
        return Ok(DetectionOutcome {
            payloads: build_payloads(original, &[])?,
            points: Vec::new(),
            counts,
        });
    }

    let predictions = registry.predict_windows(&windows.sequences)?;
    let scores = reconstruction_errors(&windows, &predictions)?;
    let points = classify(&scores, registry.classifier())?;
    let payloads = build_payloads(original, &points)?;

    info!(
        rows = counts.input_rows,
        windows = counts.windows,
        anomalies = payloads.anomalies_count(),
        "Detection complete"
    );

    Ok(DetectionOutcome {
        payloads,
        points,
        counts,
    })
}
