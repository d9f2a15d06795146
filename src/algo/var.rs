//! Vector Autoregression (VAR) forecaster
//!
//! Inference-only VAR(k) over the scaled feature space:
//!
//! ```text
//! y_t = c + A_1 y_{t-1} + A_2 y_{t-2} + ... + A_k y_{t-k}
//! ```
//!
//! Multi-step forecasts feed each prediction back in as the newest lag.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::DetectError;
use crate::models::Forecaster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarModel {
    /// Endogenous variables in fit order
    pub feature_names: Vec<String>,
    /// Lag order `k`
    pub k_ar: usize,
    /// Constant term `c`, one per variable
    pub intercept: Vec<f64>,
    /// `coefs[i]` is the `d x d` matrix for lag `i + 1` (row = equation)
    pub coefs: Vec<Vec<Vec<f64>>>,
}

impl VarModel {
    pub fn dims(&self) -> usize {
        self.intercept.len()
    }

    /// Check that the coefficient tensor is `k x d x d`
    pub fn validate(&self) -> Result<(), String> {
        let d = self.dims();
        if self.k_ar == 0 {
            return Err("lag order must be at least 1".to_string());
        }
        if d == 0 {
            return Err("model has no variables".to_string());
        }
        if !self.feature_names.is_empty() && self.feature_names.len() != d {
            return Err(format!(
                "{} feature names for {} variables",
                self.feature_names.len(),
                d
            ));
        }
        if self.coefs.len() != self.k_ar {
            return Err(format!(
                "expected {} lag matrices, found {}",
                self.k_ar,
                self.coefs.len()
            ));
        }
        for (lag, matrix) in self.coefs.iter().enumerate() {
            if matrix.len() != d || matrix.iter().any(|row| row.len() != d) {
                return Err(format!("lag {} matrix is not {}x{}", lag + 1, d, d));
            }
        }
        Ok(())
    }

    /// One-step prediction. `lags[0]` is the most recent observation.
    fn step(&self, lags: &VecDeque<Vec<f64>>) -> Vec<f64> {
        let mut next = self.intercept.clone();
        for (matrix, lagged) in self.coefs.iter().zip(lags.iter()) {
            for (eq, row) in matrix.iter().enumerate() {
                next[eq] += row.iter().zip(lagged.iter()).map(|(a, y)| a * y).sum::<f64>();
            }
        }
        next
    }
}

impl Forecaster for VarModel {
    fn order(&self) -> usize {
        self.k_ar
    }

    fn forecast(&self, history: &[Vec<f64>], steps: usize) -> Result<Vec<Vec<f64>>, DetectError> {
        if history.len() < self.k_ar {
            return Err(DetectError::InsufficientHistory {
                stage: "forecast",
                required: self.k_ar,
                available: history.len(),
            });
        }

        let d = self.dims();
        if let Some(row) = history.iter().find(|r| r.len() != d) {
            return Err(DetectError::inference(format!(
                "VAR expects {} variables, history row has {}",
                d,
                row.len()
            )));
        }

        // most recent first
        let mut lags: VecDeque<Vec<f64>> = history.iter().rev().take(self.k_ar).cloned().collect();

        let mut out = Vec::with_capacity(steps);
        for _ in 0..steps {
            let next = self.step(&lags);
            lags.pop_back();
            lags.push_front(next.clone());
            out.push(next);
        }

        Ok(out)
    }
}
