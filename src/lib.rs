//! OHLCV anomaly sentinel
//!
//! Scores daily `Open, High, Low, Close, Volume` bars for anomalies with a
//! fixed inference pipeline: a VAR forecaster, an LSTM over the forecast
//! residuals and an isolation forest over the LSTM's reconstruction errors.
//!
//! Entry points:
//! - [`run_detection`]: CSV text in, response JSON out (process-wide models)
//! - [`Sentinel`]: the same over an explicitly loaded registry
//! - [`pipeline::detect`]: the pipeline over an already-built [`Frame`]

pub mod algo;
pub mod artifact;
pub mod config;
pub mod error;
pub mod ffi;
pub mod forecast;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod payload;
pub mod pipeline;
pub mod registry;
pub mod residual;
pub mod runtime;
pub mod scaler;
pub mod scoring;
pub mod table;
pub mod window;

pub use config::{ForecastAnchor, PipelineOptions, SentinelConfig};
pub use error::{DetectError, LoadError};
pub use payload::DetectionResponse;
pub use registry::ModelRegistry;
pub use runtime::{Sentinel, run_detection};
pub use table::Frame;
