//! Versioned model artifacts
//!
//! Fitted models are produced by the training side and shipped as files.
//! Each file is an envelope `{version, kind, model}` encoded as JSON
//! (`.json`) or bincode (anything else). This module only
//! serializes/deserializes; it never fits anything.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::LoadError;

/// Version for artifact format migrations
pub const ARTIFACT_VERSION: u32 = 1;

/// What an artifact file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Forecaster,
    Scaler,
    SequenceRegressor,
    OutlierClassifier,
}

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Bincode,
}

impl ArtifactFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Bincode,
        }
    }
}

/// Envelope around a fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact<M> {
    pub version: u32,
    pub kind: ArtifactKind,
    pub model: M,
}

impl<M> Artifact<M>
where
    M: Serialize + DeserializeOwned,
{
    pub fn new(kind: ArtifactKind, model: M) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            kind,
            model,
        }
    }

    pub fn to_bytes(&self, format: ArtifactFormat, label: &str) -> Result<Vec<u8>, LoadError> {
        let encoded = match format {
            ArtifactFormat::Json => serde_json::to_vec_pretty(self).map_err(|e| e.to_string()),
            ArtifactFormat::Bincode => bincode::serialize(self).map_err(|e| e.to_string()),
        };
        encoded.map_err(|message| LoadError::Parse {
            artifact: label.to_string(),
            message,
        })
    }

    /// Decode and check the format version.
    pub fn from_bytes(bytes: &[u8], format: ArtifactFormat, label: &str) -> Result<Self, LoadError> {
        let decoded: Result<Self, String> = match format {
            ArtifactFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            ArtifactFormat::Bincode => bincode::deserialize(bytes).map_err(|e| e.to_string()),
        };
        let artifact = decoded.map_err(|message| LoadError::Parse {
            artifact: label.to_string(),
            message,
        })?;

        if artifact.version > ARTIFACT_VERSION {
            return Err(LoadError::UnsupportedVersion {
                artifact: label.to_string(),
                found: artifact.version,
                max_supported: ARTIFACT_VERSION,
            });
        }

        Ok(artifact)
    }

    /// Write to `path`, encoding chosen by extension
    pub fn write(&self, path: &Path) -> Result<(), LoadError> {
        let label = path.display().to_string();
        let bytes = self.to_bytes(ArtifactFormat::from_path(path), &label)?;
        std::fs::write(path, bytes).map_err(|e| LoadError::Io {
            artifact: label,
            message: e.to_string(),
        })
    }
}

/// Read the model of kind `kind` stored at `path`
pub fn read_model<M>(path: &Path, kind: ArtifactKind) -> Result<M, LoadError>
where
    M: Serialize + DeserializeOwned,
{
    let label = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|e| LoadError::Io {
        artifact: label.clone(),
        message: e.to_string(),
    })?;

    let artifact = Artifact::<M>::from_bytes(&bytes, ArtifactFormat::from_path(path), &label)?;
    if artifact.kind != kind {
        return Err(LoadError::invalid(
            label,
            format!("expected {:?} artifact, found {:?}", kind, artifact.kind),
        ));
    }

    Ok(artifact.model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::VarModel;
    use crate::scaler::AffineScaler;

    fn sample_var() -> VarModel {
        VarModel {
            feature_names: vec!["Close".to_string()],
            k_ar: 1,
            intercept: vec![0.1],
            coefs: vec![vec![vec![0.9]]],
        }
    }

    #[test]
    fn test_json_and_bincode_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["var.json", "var.bin"] {
            let path = dir.path().join(name);
            Artifact::new(ArtifactKind::Forecaster, sample_var())
                .write(&path)
                .unwrap();

            let restored: VarModel = read_model(&path, ArtifactKind::Forecaster).unwrap();
            assert_eq!(restored, sample_var());
        }
    }

    #[test]
    fn test_version_check() {
        let mut artifact = Artifact::new(ArtifactKind::Forecaster, sample_var());
        artifact.version = 999;

        let bytes = bincode::serialize(&artifact).unwrap();
        let result = Artifact::<VarModel>::from_bytes(&bytes, ArtifactFormat::Bincode, "var");

        assert!(matches!(
            result,
            Err(LoadError::UnsupportedVersion { found: 999, .. })
        ));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        Artifact::new(
            ArtifactKind::Scaler,
            AffineScaler::standard(vec!["Close".to_string()], vec![0.0], vec![1.0]),
        )
        .write(&path)
        .unwrap();

        let result: Result<AffineScaler, _> = read_model(&path, ArtifactKind::SequenceRegressor);
        assert!(matches!(result, Err(LoadError::Invalid { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result: Result<VarModel, _> =
            read_model(Path::new("/nonexistent/var.json"), ArtifactKind::Forecaster);
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ArtifactFormat::from_path(Path::new("a/b.JSON")), ArtifactFormat::Json);
        assert_eq!(ArtifactFormat::from_path(Path::new("a/b.bin")), ArtifactFormat::Bincode);
        assert_eq!(ArtifactFormat::from_path(Path::new("a/b")), ArtifactFormat::Bincode);
    }
}
