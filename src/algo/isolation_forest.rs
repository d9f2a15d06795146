//! Isolation Forest (inference only)
//!
//! Scores points by how quickly random axis-aligned splits isolate them:
//! short average path length means an outlier. Trees are stored as flat node
//! arrays, children always at higher indices than their parent.
//!
//! Scoring:
//! - path length at a leaf adds `c(n)` for the `n` training samples it held
//! - `score = -2^(-mean_path / c(max_samples))`
//! - `decision = score - offset`, outlier iff `decision < 0`
//!
//! Reference: "Isolation Forest" (Liu, Ting, Zhou, ICDM 2008)

use serde::{Deserialize, Serialize};

use crate::error::DetectError;
use crate::models::{INLIER, OUTLIER, OutlierClassifier};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        n_samples: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    pub nodes: Vec<TreeNode>,
}

impl IsolationTree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                if *feature >= n_features {
                    return Err(format!("node {} splits on feature {}", idx, feature));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {} has non-finite threshold", idx));
                }
                // forward-only children rule out cycles
                for &child in [left, right] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(format!("node {} has invalid child {}", idx, child));
                    }
                }
            }
        }
        Ok(())
    }

    fn path_length(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { n_samples } => return depth + average_path_length(*n_samples),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // fitted trees compare in single precision
                    idx = if (x[*feature] as f32) <= (*threshold as f32) {
                        *left
                    } else {
                        *right
                    };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Fitted isolation forest artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Subsample size each tree was grown on
    pub max_samples: usize,
    /// Decision threshold fitted from the contamination rate
    pub offset: f64,
    pub n_features: usize,
    pub trees: Vec<IsolationTree>,
}

impl IsolationForest {
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.max_samples < 2 {
            return Err("max_samples must be at least 2".to_string());
        }
        if self.n_features == 0 {
            return Err("forest has no features".to_string());
        }
        if !self.offset.is_finite() {
            return Err("offset must be finite".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Anomaly score in `[-1, 0)`; lower is more anomalous
    pub fn score_sample(&self, x: &[f64]) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(x)).sum::<f64>()
            / self.trees.len() as f64;
        -(2f64).powf(-mean_path / average_path_length(self.max_samples))
    }

    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.score_sample(x) - self.offset
    }
}

impl OutlierClassifier for IsolationForest {
    fn predict(&self, scores: &[f64]) -> Result<Vec<i8>, DetectError> {
        if self.n_features != 1 {
            return Err(DetectError::inference(format!(
                "classifier fitted on {} features, scores are scalar",
                self.n_features
            )));
        }
        Ok(scores
            .iter()
            .map(|&s| {
                if self.decision_function(&[s]) < 0.0 {
                    OUTLIER
                } else {
                    INLIER
                }
            })
            .collect())
    }
}
