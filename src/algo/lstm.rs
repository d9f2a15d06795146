//! LSTM sequence regressor (inference only)
//!
//! Stacked LSTM layers followed by dense layers, evaluated one window at a
//! time. Weight layout follows the usual Keras export:
//! - kernel: `input_dim x 4u`, recurrent kernel: `u x 4u`, bias: `4u`
//! - gate order `i, f, c, o`
//! - sigmoid recurrent activation, tanh cell activation
//!
//! Every LSTM layer except the last returns its full output sequence; the last
//! one returns only its final hidden state, which feeds the dense head.

use serde::{Deserialize, Serialize};

use crate::error::DetectError;
use crate::models::SequenceRegressor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    #[inline]
    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Relu => x.max(0.0),
            Self::Tanh => x.tanh(),
            Self::Sigmoid => sigmoid(x),
        }
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmLayer {
    pub units: usize,
    pub kernel: Vec<Vec<f64>>,
    pub recurrent_kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl LstmLayer {
    pub fn input_dim(&self) -> usize {
        self.kernel.len()
    }

    fn validate(&self, expected_input: usize) -> Result<(), String> {
        let gates = 4 * self.units;
        if self.units == 0 {
            return Err("LSTM layer has zero units".to_string());
        }
        if self.kernel.len() != expected_input || self.kernel.iter().any(|r| r.len() != gates) {
            return Err(format!("kernel must be {}x{}", expected_input, gates));
        }
        if self.recurrent_kernel.len() != self.units
            || self.recurrent_kernel.iter().any(|r| r.len() != gates)
        {
            return Err(format!("recurrent kernel must be {}x{}", self.units, gates));
        }
        if self.bias.len() != gates {
            return Err(format!("bias must have {} entries", gates));
        }
        Ok(())
    }

    /// Run the layer over a sequence, returning the hidden state at every step.
    fn run(&self, inputs: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let u = self.units;
        let mut h = vec![0.0; u];
        let mut c = vec![0.0; u];
        let mut outputs = Vec::with_capacity(inputs.len());
        let mut z = vec![0.0; 4 * u];

        for x in inputs {
            z.copy_from_slice(&self.bias);
            for (xi, row) in x.iter().zip(self.kernel.iter()) {
                for (zj, w) in z.iter_mut().zip(row.iter()) {
                    *zj += xi * w;
                }
            }
            for (hi, row) in h.iter().zip(self.recurrent_kernel.iter()) {
                for (zj, w) in z.iter_mut().zip(row.iter()) {
                    *zj += hi * w;
                }
            }

            for j in 0..u {
                let i_gate = sigmoid(z[j]);
                let f_gate = sigmoid(z[u + j]);
                let g = z[2 * u + j].tanh();
                let o_gate = sigmoid(z[3 * u + j]);
                c[j] = f_gate * c[j] + i_gate * g;
                h[j] = o_gate * c[j].tanh();
            }
            outputs.push(h.clone());
        }

        outputs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `input_dim x output_dim`
    pub kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn validate(&self, expected_input: usize) -> Result<(), String> {
        let out = self.bias.len();
        if out == 0 {
            return Err("dense layer has no outputs".to_string());
        }
        if self.kernel.len() != expected_input || self.kernel.iter().any(|r| r.len() != out) {
            return Err(format!("dense kernel must be {}x{}", expected_input, out));
        }
        Ok(())
    }

    fn forward(&self, x: &[f64]) -> Vec<f64> {
        let mut y = self.bias.clone();
        for (xi, row) in x.iter().zip(self.kernel.iter()) {
            for (yj, w) in y.iter_mut().zip(row.iter()) {
                *yj += xi * w;
            }
        }
        y.iter_mut().for_each(|v| *v = self.activation.apply(*v));
        y
    }
}

/// Fitted LSTM regressor artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmRegressor {
    pub lstm: Vec<LstmLayer>,
    pub dense: Vec<DenseLayer>,
}

impl LstmRegressor {
    /// Width of each input row
    pub fn input_dim(&self) -> usize {
        self.lstm.first().map(|l| l.input_dim()).unwrap_or(0)
    }

    /// Width of each prediction
    pub fn output_dim(&self) -> usize {
        match self.dense.last() {
            Some(layer) => layer.bias.len(),
            None => self.lstm.last().map(|l| l.units).unwrap_or(0),
        }
    }

    /// Check that layer shapes chain together
    pub fn validate(&self) -> Result<(), String> {
        if self.lstm.is_empty() {
            return Err("regressor has no LSTM layers".to_string());
        }

        let mut width = self.input_dim();
        if width == 0 {
            return Err("first LSTM layer has zero input width".to_string());
        }
        for (i, layer) in self.lstm.iter().enumerate() {
            layer
                .validate(width)
                .map_err(|e| format!("lstm[{}]: {}", i, e))?;
            width = layer.units;
        }
        for (i, layer) in self.dense.iter().enumerate() {
            layer
                .validate(width)
                .map_err(|e| format!("dense[{}]: {}", i, e))?;
            width = layer.bias.len();
        }
        Ok(())
    }

    /// Predict the next vector for one window
    pub fn forward(&self, window: &[Vec<f64>]) -> Vec<f64> {
        let mut seq: Vec<Vec<f64>> = window.to_vec();
        for layer in &self.lstm {
            seq = layer.run(&seq);
        }

        let mut x = seq.pop().unwrap_or_else(|| vec![0.0; self.output_dim()]);
        for layer in &self.dense {
            x = layer.forward(&x);
        }
        x
    }
}

impl SequenceRegressor for LstmRegressor {
    fn predict(&self, batch: &[&[Vec<f64>]]) -> Result<Vec<Vec<f64>>, DetectError> {
        let width = self.input_dim();
        batch
            .iter()
            .map(|window| {
                if window.is_empty() {
                    return Err(DetectError::inference("empty input window"));
                }
                if let Some(row) = window.iter().find(|r| r.len() != width) {
                    return Err(DetectError::inference(format!(
                        "LSTM expects {} features per step, got {}",
                        width,
                        row.len()
                    )));
                }
                Ok(self.forward(window))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One unit, one input; gates driven only by bias unless weights set
    fn single_unit(kernel: [f64; 4], bias: [f64; 4]) -> LstmLayer {
        LstmLayer {
            units: 1,
            kernel: vec![kernel.to_vec()],
            recurrent_kernel: vec![vec![0.0; 4]],
            bias: bias.to_vec(),
        }
    }

    #[test]
    fn test_single_step_matches_hand_computation() {
        // i = f = o = sigmoid(0) = 0.5, g = tanh(x)
        let layer = single_unit([0.0, 0.0, 1.0, 0.0], [0.0; 4]);
        let out = layer.run(&[vec![0.5]]);

        let c = 0.5 * 0.5f64.tanh();
        let h = 0.5 * c.tanh();
        assert!((out[0][0] - h).abs() < 1e-12);
    }

    #[test]
    fn test_forget_gate_carries_cell_state() {
        // forget gate saturated open; zero input adds nothing to the cell
        let layer = single_unit([0.0, 0.0, 1.0, 0.0], [0.0, 50.0, 0.0, 50.0]);
        let out = layer.run(&[vec![1.0], vec![0.0], vec![0.0]]);

        // cell state persists, so hidden state stays roughly constant
        assert!((out[1][0] - out[2][0]).abs() < 1e-6);
        assert!(out[2][0] > 0.2);
    }

    #[test]
    fn test_dense_head_and_shapes() {
        let model = LstmRegressor {
            lstm: vec![single_unit([0.0, 0.0, 1.0, 0.0], [0.0; 4])],
            dense: vec![DenseLayer {
                kernel: vec![vec![2.0, -1.0]],
                bias: vec![0.5, 0.0],
                activation: Activation::Relu,
            }],
        };
        assert!(model.validate().is_ok());
        assert_eq!(model.input_dim(), 1);
        assert_eq!(model.output_dim(), 2);

        let window = vec![vec![0.3]; 4];
        let out = model.predict(&[&window[..]]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 2);
        // relu clamps the negative branch
        assert_eq!(out[0][1], 0.0);
        assert!(out[0][0] > 0.5);
    }

    #[test]
    fn test_stacked_layers_validate_chain() {
        let first = LstmLayer {
            units: 2,
            kernel: vec![vec![0.1; 8]; 3],
            recurrent_kernel: vec![vec![0.1; 8]; 2],
            bias: vec![0.0; 8],
        };
        let second = LstmLayer {
            units: 1,
            kernel: vec![vec![0.1; 4]; 2],
            recurrent_kernel: vec![vec![0.1; 4]; 1],
            bias: vec![0.0; 4],
        };
        let model = LstmRegressor {
            lstm: vec![first.clone(), second],
            dense: vec![],
        };
        assert!(model.validate().is_ok());

        let broken = LstmRegressor {
            lstm: vec![first.clone(), first],
            dense: vec![],
        };
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_wrong_feature_width_rejected() {
        let model = LstmRegressor {
            lstm: vec![single_unit([0.0; 4], [0.0; 4])],
            dense: vec![],
        };
        let window = vec![vec![1.0, 2.0]];
        assert!(matches!(
            model.predict(&[&window[..]]),
            Err(DetectError::Inference(_))
        ));
    }
}
