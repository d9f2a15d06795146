//! Invocation boundary
//!
//! `Sentinel` pairs a loaded registry with pipeline options and turns CSV text
//! into a `DetectionResponse`. A process-wide slot holds the result of loading
//! once at startup; a failed load is kept (not retried) and every later
//! invocation reports it as `ModelUnavailable`.

use once_cell::sync::OnceCell;
use tracing::{info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::config::{PipelineOptions, SentinelConfig};
use crate::error::{DetectError, LoadError};
use crate::ingest::parse_csv;
use crate::metrics::{
    ANOMALIES_FLAGGED, DETECTION_ERRORS, DETECTION_LATENCY, DETECTIONS_TOTAL, WINDOWS_SCORED,
};
use crate::payload::DetectionResponse;
use crate::pipeline::{DetectionOutcome, detect};
use crate::registry::ModelRegistry;
use crate::table::Frame;

static SENTINEL: OnceCell<Result<Sentinel, LoadError>> = OnceCell::new();

pub struct Sentinel {
    registry: ModelRegistry,
    options: PipelineOptions,
}

impl Sentinel {
    pub fn new(registry: ModelRegistry, options: PipelineOptions) -> Self {
        Self { registry, options }
    }

    /// Load every artifact named by `config`
    pub fn load(config: &SentinelConfig) -> Result<Self, LoadError> {
        config.validate()?;
        let registry = ModelRegistry::load(config)?;
        Ok(Self::new(registry, config.pipeline))
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn detect_frame(&self, frame: &Frame) -> Result<DetectionOutcome, DetectError> {
        detect(frame, &self.registry, &self.options)
    }

    /// Parse `csv` and run the pipeline, keeping the typed outcome
    pub fn detect_csv(&self, csv: &str) -> Result<DetectionOutcome, DetectError> {
        observe(csv, |frame| self.detect_frame(&frame))
    }

    /// Parse `csv` and run the pipeline
    pub fn evaluate(&self, csv: &str) -> DetectionResponse {
        into_response(self.detect_csv(csv))
    }

    /// `evaluate` encoded as JSON
    pub fn run(&self, csv: &str) -> String {
        self.evaluate(csv).to_json()
    }
}

/// Parse, run `pipeline` and record metrics. Input errors win over model errors.
fn observe<F>(csv: &str, pipeline: F) -> Result<DetectionOutcome, DetectError>
where
    F: FnOnce(Frame) -> Result<DetectionOutcome, DetectError>,
{
    let timer = DETECTION_LATENCY.start_timer();
    DETECTIONS_TOTAL.inc();
    let fingerprint = format!("{:016x}", xxh3_64(csv.as_bytes()));

    let result = parse_csv(csv).and_then(pipeline);
    match &result {
        Ok(outcome) => {
            ANOMALIES_FLAGGED.inc_by(outcome.anomalies_count() as f64);
            WINDOWS_SCORED.inc_by(outcome.counts.windows as f64);
            info!(
                input = %fingerprint,
                rows = outcome.counts.input_rows,
                anomalies = outcome.anomalies_count(),
                "Detection succeeded"
            );
        }
        Err(e) => {
            DETECTION_ERRORS.with_label_values(&[e.kind()]).inc();
            warn!(
                input = %fingerprint,
                kind = e.kind(),
                error = %e,
                "Detection failed"
            );
        }
    }

    timer.observe_duration();
    result
}

pub fn into_response(result: Result<DetectionOutcome, DetectError>) -> DetectionResponse {
    match result {
        Ok(outcome) => outcome.payloads.into_response(),
        Err(e) => DetectionResponse::from_error(&e),
    }
}

/// Load the process-wide sentinel from `config`.
///
/// Only the first call loads; later calls report the stored outcome. Returns
/// whether models are available. A load failure is logged, never fatal.
pub fn init(config: &SentinelConfig) -> bool {
    let mut fresh = false;
    let slot = SENTINEL.get_or_init(|| {
        fresh = true;
        load_logged(config)
    });
    if !fresh {
        warn!("Sentinel already initialized, ignoring new configuration");
    }
    slot.is_ok()
}

fn load_logged(config: &SentinelConfig) -> Result<Sentinel, LoadError> {
    let result = Sentinel::load(config);
    match &result {
        Ok(_) => info!(model_dir = %config.model_dir.display(), "Sentinel ready"),
        Err(e) => warn!(
            model_dir = %config.model_dir.display(),
            artifact = e.artifact(),
            error = %e,
            "Error loading models, detections will fail until restart"
        ),
    }
    result
}

/// The process-wide sentinel, loading from the environment on first use
pub fn global() -> Result<&'static Sentinel, DetectError> {
    SENTINEL
        .get_or_init(|| load_logged(&SentinelConfig::from_env()))
        .as_ref()
        .map_err(|e| DetectError::from(e.clone()))
}

/// Whether the process-wide sentinel loaded successfully (without loading it)
pub fn models_ready() -> bool {
    matches!(SENTINEL.get(), Some(Ok(_)))
}

/// Run `csv` through the process-wide sentinel, keeping the typed outcome
pub fn detect_csv(csv: &str) -> Result<DetectionOutcome, DetectError> {
    observe(csv, |frame| global()?.detect_frame(&frame))
}

/// Evaluate `csv` against the process-wide sentinel
pub fn evaluate(csv: &str) -> DetectionResponse {
    into_response(detect_csv(csv))
}

/// CSV text in, response JSON out. Never panics on bad input or missing models.
pub fn run_detection(csv: &str) -> String {
    evaluate(csv).to_json()
}
