//! Runtime configuration
//!
//! Defaults mirror the layout the training side writes
//! (`models/…`, `scalers/…` under one model directory). Values can come from
//! an optional JSON file and are then overridden by environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::LoadError;

pub const ENV_MODEL_DIR: &str = "SENTINEL_MODEL_DIR";
pub const ENV_WINDOW_LEN: &str = "SENTINEL_WINDOW_LEN";
pub const ENV_REANCHOR_EVERY: &str = "SENTINEL_REANCHOR_EVERY";

/// Default sequence length the regressor was trained on
pub const DEFAULT_WINDOW_LEN: usize = 10;

/// How the forecaster is seeded across the input range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForecastAnchor {
    /// Seed once from the last `k` rows and forecast the whole range
    #[default]
    Tail,
    /// Re-seed from the actual `k` rows preceding every block of `every` rows
    Rolling { every: usize },
}

/// Artifact file locations, relative to `model_dir` unless absolute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub var_model: PathBuf,
    pub var_scaler: PathBuf,
    pub lstm_scaler: PathBuf,
    pub lstm_model: PathBuf,
    pub isolation_forest: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            var_model: PathBuf::from("models/var_model.json"),
            var_scaler: PathBuf::from("scalers/var_scaler.json"),
            lstm_scaler: PathBuf::from("scalers/lstm_scaler.json"),
            lstm_model: PathBuf::from("models/lstm_model.json"),
            isolation_forest: PathBuf::from("models/isolation_forest_model.json"),
        }
    }
}

/// Pipeline knobs that do not depend on the loaded models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Sliding window length fed to the sequence regressor
    pub window_len: usize,
    pub forecast_anchor: ForecastAnchor,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            window_len: DEFAULT_WINDOW_LEN,
            forecast_anchor: ForecastAnchor::Tail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub model_dir: PathBuf,
    pub artifacts: ArtifactPaths,
    pub pipeline: PipelineOptions,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("."),
            artifacts: ArtifactPaths::default(),
            pipeline: PipelineOptions::default(),
        }
    }
}

impl SentinelConfig {
    /// Defaults overridden by the environment
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Read a JSON config file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let label = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            artifact: label.clone(),
            message: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| LoadError::Parse {
            artifact: label,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_MODEL_DIR).filter(|s| !s.trim().is_empty()) {
            self.model_dir = PathBuf::from(dir.trim());
        }
        if let Some(len) = lookup(ENV_WINDOW_LEN).and_then(|s| s.trim().parse().ok()) {
            self.pipeline.window_len = len;
        }
        if let Some(every) = lookup(ENV_REANCHOR_EVERY).and_then(|s| s.trim().parse().ok()) {
            self.pipeline.forecast_anchor = match every {
                0 => ForecastAnchor::Tail,
                every => ForecastAnchor::Rolling { every },
            };
        }
        self
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.pipeline.window_len == 0 {
            return Err(LoadError::invalid("config", "window_len must be at least 1"));
        }
        if let ForecastAnchor::Rolling { every: 0 } = self.pipeline.forecast_anchor {
            return Err(LoadError::invalid(
                "config",
                "rolling forecast anchor needs every >= 1",
            ));
        }
        Ok(())
    }

    /// Absolute location of an artifact
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.model_dir.join(relative)
        }
    }
}
