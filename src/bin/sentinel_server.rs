//! sentinel-server - HTTP front for the detection pipeline
//!
//! Routes:
//!   POST /detect   CSV body -> detection response JSON
//!   GET  /health   liveness plus model availability
//!   GET  /stats    loaded model summary
//!   GET  /metrics  Prometheus exposition

use axum::{
    Json, Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ohlcv_sentinel::error::DetectError;
use ohlcv_sentinel::pipeline::DetectionOutcome;
use ohlcv_sentinel::{DetectionResponse, SentinelConfig, metrics, runtime};
use serde::Serialize;
use std::path::Path;
use tokio::net::TcpListener;
use tracing::{error, info};

const ENV_ADDR: &str = "SENTINEL_ADDR";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";

// ====== Handlers ======

/// Input problems are the caller's; a missing model or a broken kernel is ours
fn status_for(result: &Result<DetectionOutcome, DetectError>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::OK,
        Err(DetectError::ModelUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        Err(DetectError::Inference(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        Err(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

async fn detect(body: String) -> Response {
    let (status, response) =
        match tokio::task::spawn_blocking(move || runtime::detect_csv(&body)).await {
            Ok(result) => (status_for(&result), runtime::into_response(result)),
            Err(e) => {
                error!(error = %e, "Detection task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    DetectionResponse::Error {
                        message: "detection task failed".to_string(),
                        missing: None,
                    },
                )
            }
        };

    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        response.to_json(),
    )
        .into_response()
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    models_ready: bool,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        models_ready: runtime::models_ready(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn stats() -> Response {
    match runtime::global() {
        Ok(sentinel) => Json(serde_json::json!({
            "models": sentinel.registry().summary(),
            "pipeline": sentinel.options(),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn metrics_handler() -> String {
    metrics::render()
}

// ====== Main ======

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    info!(version = env!("CARGO_PKG_VERSION"), "Initializing sentinel server");
    metrics::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match SentinelConfig::from_file(Path::new(&path)) {
            Ok(config) => config.with_env_overrides(),
            Err(e) => {
                error!(error = %e, "Invalid config file, falling back to defaults");
                SentinelConfig::from_env()
            }
        },
        None => SentinelConfig::from_env(),
    };

    // Loading is blocking file IO and may fail; the server keeps serving either way
    let ready = tokio::task::spawn_blocking(move || runtime::init(&config))
        .await
        .unwrap_or(false);
    info!(models_ready = ready, "Model registry initialized");

    let app = Router::new()
        .route("/detect", post(detect))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(metrics_handler));

    let addr = std::env::var(ENV_ADDR).unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = match TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!(addr = %addr, "Sentinel listening.");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install CTRL+C handler");
        }
        info!("Shutting down...");
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
