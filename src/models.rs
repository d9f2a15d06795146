//! Capability traits for the fitted collaborators.
//!
//! The pipeline never sees concrete model types. Loaded artifacts
//! (`algo::*`, `scaler::AffineScaler`) implement these traits, and tests
//! substitute their own fakes.

use crate::error::DetectError;

/// Verdict emitted by an outlier classifier for an atypical value
pub const OUTLIER: i8 = -1;
/// Verdict emitted by an outlier classifier for a typical value
pub const INLIER: i8 = 1;

/// Affine per-column transform with a fixed fitted column set
pub trait FittedScaler: Send + Sync {
    /// Columns in fit order
    fn feature_names(&self) -> &[String];

    /// Transform one row given in fit order
    fn transform_row(&self, row: &[f64]) -> Vec<f64>;
}

/// Fitted autoregressive forecaster over the scaled feature space
pub trait Forecaster: Send + Sync {
    /// Autoregressive order `k`: rows of history consumed as seed state
    fn order(&self) -> usize;

    /// Forecast `steps` rows continuing `history` (at least `order()` rows).
    fn forecast(&self, history: &[Vec<f64>], steps: usize) -> Result<Vec<Vec<f64>>, DetectError>;
}

/// Fitted sequence regressor predicting the next residual vector of a window
pub trait SequenceRegressor: Send + Sync {
    fn predict(&self, batch: &[&[Vec<f64>]]) -> Result<Vec<Vec<f64>>, DetectError>;

    /// Whether concurrent `predict` calls are safe.
    ///
    /// Non-reentrant regressors are serialized by the model registry.
    fn is_reentrant(&self) -> bool {
        true
    }
}

/// Fitted unsupervised outlier detector over scalar scores
pub trait OutlierClassifier: Send + Sync {
    /// One verdict per score: `OUTLIER` (-1) or `INLIER` (+1)
    fn predict(&self, scores: &[f64]) -> Result<Vec<i8>, DetectError>;
}
