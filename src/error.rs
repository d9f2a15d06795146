//! Error taxonomy for detection runs and model loading.
//!
//! `DetectError` covers everything that can go wrong inside one invocation and
//! is always converted into the structured error response at the boundary.
//! `LoadError` covers artifact loading at process start.

use std::fmt;

/// Failure inside a single detection invocation
#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    /// Required input columns are absent (listed in canonical order)
    MissingColumns(Vec<String>),
    /// Unparsable dates, duplicate dates, bad values or scaler column mismatch
    Schema(String),
    /// A stage needs more rows than the input provides
    InsufficientHistory {
        stage: &'static str,
        required: usize,
        available: usize,
    },
    /// A required fitted model failed to load at startup
    ModelUnavailable(String),
    /// A fitted model produced an unusable result
    Inference(String),
}

impl DetectError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    /// Short machine-readable tag, used for metrics labels and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingColumns(_) | Self::Schema(_) => "schema",
            Self::InsufficientHistory { .. } => "insufficient_history",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::Inference(_) => "inference",
        }
    }
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumns(_) => write!(f, "Missing required columns"),
            Self::Schema(e) => write!(f, "Schema error: {}", e),
            Self::InsufficientHistory {
                stage,
                required,
                available,
            } => write!(
                f,
                "Insufficient history for {}: need at least {} rows, got {}",
                stage, required, available
            ),
            Self::ModelUnavailable(e) => write!(f, "Model unavailable: {}", e),
            Self::Inference(e) => write!(f, "Inference failed: {}", e),
        }
    }
}

impl std::error::Error for DetectError {}

impl From<csv::Error> for DetectError {
    fn from(e: csv::Error) -> Self {
        Self::Schema(format!("CSV parse error: {}", e))
    }
}

/// Failure while loading configuration or a fitted artifact
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    Io {
        artifact: String,
        message: String,
    },
    Parse {
        artifact: String,
        message: String,
    },
    UnsupportedVersion {
        artifact: String,
        found: u32,
        max_supported: u32,
    },
    /// Artifact decoded but its contents are inconsistent
    Invalid {
        artifact: String,
        message: String,
    },
}

impl LoadError {
    pub fn invalid(artifact: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            artifact: artifact.into(),
            message: message.into(),
        }
    }

    pub fn artifact(&self) -> &str {
        match self {
            Self::Io { artifact, .. }
            | Self::Parse { artifact, .. }
            | Self::UnsupportedVersion { artifact, .. }
            | Self::Invalid { artifact, .. } => artifact,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { artifact, message } => write!(f, "Failed to read {}: {}", artifact, message),
            Self::Parse { artifact, message } => {
                write!(f, "Failed to decode {}: {}", artifact, message)
            }
            Self::UnsupportedVersion {
                artifact,
                found,
                max_supported,
            } => write!(
                f,
                "Unsupported artifact version in {}: {} (max supported: {})",
                artifact, found, max_supported
            ),
            Self::Invalid { artifact, message } => write!(f, "Invalid {}: {}", artifact, message),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<LoadError> for DetectError {
    fn from(e: LoadError) -> Self {
        Self::ModelUnavailable(e.to_string())
    }
}
