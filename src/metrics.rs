//! Process-wide Prometheus metrics
//!
//! Registered lazily in the default registry on first use, so every host
//! surface (server, CLI, C ABI) reports through the same counters.

use once_cell::sync::Lazy;
use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, TextEncoder};

pub static DETECTIONS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("sentinel_detections_total", "Total detection invocations").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static DETECTION_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    let c = CounterVec::new(
        Opts::new("sentinel_detection_errors_total", "Failed detection invocations"),
        &["kind"],
    )
    .unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static ANOMALIES_FLAGGED: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("sentinel_anomalies_total", "Total points labelled anomalous").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static WINDOWS_SCORED: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("sentinel_windows_scored_total", "Total residual windows scored").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static DETECTION_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    let h = Histogram::with_opts(HistogramOpts::new(
        "sentinel_detection_duration_seconds",
        "Histogram of end-to-end detection latency",
    ))
    .unwrap();
    prometheus::register(Box::new(h.clone())).unwrap();
    h
});

/// Force registration so `/metrics` lists every series from the start
pub fn init() {
    let _ = &*DETECTIONS_TOTAL;
    let _ = &*DETECTION_ERRORS;
    let _ = &*ANOMALIES_FLAGGED;
    let _ = &*WINDOWS_SCORED;
    let _ = &*DETECTION_LATENCY;
}

/// Text exposition of the default registry
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
