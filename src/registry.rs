//! Read-only Model Registry
//!
//! Holds the five fitted collaborators the pipeline needs:
//! - raw-feature scaler and VAR forecaster
//! - residual scaler and sequence regressor
//! - outlier classifier over reconstruction errors
//!
//! A registry is built once (from artifacts or from injected parts) and never
//! mutated afterwards, so it can be shared across concurrent invocations.
//! Regressors that are not reentrant are serialized behind `regressor_gate`.

use serde::Serialize;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::algo::{IsolationForest, LstmRegressor, VarModel};
use crate::artifact::{ArtifactKind, read_model};
use crate::config::SentinelConfig;
use crate::error::{DetectError, LoadError};
use crate::models::{FittedScaler, Forecaster, OutlierClassifier, SequenceRegressor};
use crate::scaler::AffineScaler;

/// Summary of what is loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelSummary {
    /// Autoregressive order `k` of the forecaster
    pub forecaster_order: usize,
    /// Columns the raw scaler was fitted on
    pub features: Vec<String>,
    /// Columns the residual scaler was fitted on
    pub residual_features: Vec<String>,
    /// Human-readable description of the regressor
    pub regressor: String,
    /// Human-readable description of the classifier
    pub classifier: String,
    pub regressor_reentrant: bool,
}

pub struct ModelRegistry {
    var_scaler: Box<dyn FittedScaler>,
    forecaster: Box<dyn Forecaster>,
    residual_scaler: Box<dyn FittedScaler>,
    regressor: Box<dyn SequenceRegressor>,
    classifier: Box<dyn OutlierClassifier>,
    regressor_gate: Mutex<()>,
    summary: ModelSummary,
}

impl ModelRegistry {
    /// Build a registry from already-constructed collaborators
    pub fn from_parts(
        var_scaler: impl FittedScaler + 'static,
        forecaster: impl Forecaster + 'static,
        residual_scaler: impl FittedScaler + 'static,
        regressor: impl SequenceRegressor + 'static,
        classifier: impl OutlierClassifier + 'static,
    ) -> Self {
        let summary = ModelSummary {
            forecaster_order: forecaster.order(),
            features: var_scaler.feature_names().to_vec(),
            residual_features: residual_scaler.feature_names().to_vec(),
            regressor: std::any::type_name_of_val(&regressor).to_string(),
            classifier: std::any::type_name_of_val(&classifier).to_string(),
            regressor_reentrant: regressor.is_reentrant(),
        };

        Self {
            var_scaler: Box::new(var_scaler),
            forecaster: Box::new(forecaster),
            residual_scaler: Box::new(residual_scaler),
            regressor: Box::new(regressor),
            classifier: Box::new(classifier),
            regressor_gate: Mutex::new(()),
            summary,
        }
    }

    /// Load and validate every artifact named by `config`.
    ///
    /// Stops at the first artifact that fails; the caller decides whether
    /// that is fatal.
    pub fn load(config: &SentinelConfig) -> Result<Self, LoadError> {
        let paths = &config.artifacts;

        let var_model: VarModel =
            load_checked(config, &paths.var_model, ArtifactKind::Forecaster, VarModel::validate)?;
        let var_scaler: AffineScaler = load_checked(
            config,
            &paths.var_scaler,
            ArtifactKind::Scaler,
            AffineScaler::validate,
        )?;
        let lstm_scaler: AffineScaler = load_checked(
            config,
            &paths.lstm_scaler,
            ArtifactKind::Scaler,
            AffineScaler::validate,
        )?;
        let lstm: LstmRegressor = load_checked(
            config,
            &paths.lstm_model,
            ArtifactKind::SequenceRegressor,
            LstmRegressor::validate,
        )?;
        let forest: IsolationForest = load_checked(
            config,
            &paths.isolation_forest,
            ArtifactKind::OutlierClassifier,
            IsolationForest::validate,
        )?;

        check_compatible(&var_model, &var_scaler, &lstm_scaler, &lstm)?;

        let regressor = format!("lstm(layers={}, dense={})", lstm.lstm.len(), lstm.dense.len());
        let classifier = format!("isolation_forest(trees={})", forest.trees.len());

        let mut registry = Self::from_parts(var_scaler, var_model, lstm_scaler, lstm, forest);
        registry.summary.regressor = regressor;
        registry.summary.classifier = classifier;

        info!(
            order = registry.summary.forecaster_order,
            features = registry.summary.features.len(),
            "Models loaded successfully."
        );
        Ok(registry)
    }

    pub fn summary(&self) -> &ModelSummary {
        &self.summary
    }

    pub fn var_scaler(&self) -> &dyn FittedScaler {
        self.var_scaler.as_ref()
    }

    pub fn forecaster(&self) -> &dyn Forecaster {
        self.forecaster.as_ref()
    }

    pub fn residual_scaler(&self) -> &dyn FittedScaler {
        self.residual_scaler.as_ref()
    }

    pub fn classifier(&self) -> &dyn OutlierClassifier {
        self.classifier.as_ref()
    }

    /// Run the sequence regressor, serializing access when it is not reentrant
    pub fn predict_windows(&self, batch: &[&[Vec<f64>]]) -> Result<Vec<Vec<f64>>, DetectError> {
        if self.regressor.is_reentrant() {
            return self.regressor.predict(batch);
        }

        // a panic inside a previous call leaves no state behind worth refusing over
        let _guard = self
            .regressor_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.regressor.predict(batch)
    }
}

fn load_checked<M, V>(
    config: &SentinelConfig,
    relative: &std::path::Path,
    kind: ArtifactKind,
    validate: V,
) -> Result<M, LoadError>
where
    M: serde::Serialize + serde::de::DeserializeOwned,
    V: Fn(&M) -> Result<(), String>,
{
    let path = config.resolve(relative);
    let model: M = read_model(&path, kind).inspect_err(|e| {
        warn!(artifact = %path.display(), error = %e, "Error loading model artifact");
    })?;
    validate(&model).map_err(|message| LoadError::invalid(path.display().to_string(), message))?;
    Ok(model)
}

/// Cross-artifact shape checks
fn check_compatible(
    var_model: &VarModel,
    var_scaler: &AffineScaler,
    lstm_scaler: &AffineScaler,
    lstm: &LstmRegressor,
) -> Result<(), LoadError> {
    let width = var_scaler.feature_names.len();
    if var_model.dims() != width {
        return Err(LoadError::invalid(
            "var_model",
            format!(
                "forecaster has {} variables, scaler has {} columns",
                var_model.dims(),
                width
            ),
        ));
    }
    if !var_model.feature_names.is_empty() && var_model.feature_names != var_scaler.feature_names {
        return Err(LoadError::invalid(
            "var_model",
            "forecaster variables differ from scaler columns",
        ));
    }
    let residual_width = lstm_scaler.feature_names.len();
    if lstm.input_dim() != residual_width || lstm.output_dim() != residual_width {
        return Err(LoadError::invalid(
            "lstm_model",
            format!(
                "regressor maps {} -> {} features, residual scaler has {}",
                lstm.input_dim(),
                lstm.output_dim(),
                residual_width
            ),
        ));
    }
    Ok(())
}
