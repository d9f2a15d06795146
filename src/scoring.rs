//! Reconstruction errors and outlier labelling
//!
//! Each window's prediction is compared to its target with the mean squared
//! error across features. The outlier classifier then labels every error:
//! an `OUTLIER` verdict becomes label 1 (anomaly), `INLIER` becomes label 0.

use chrono::NaiveDate;

use crate::error::DetectError;
use crate::models::{INLIER, OUTLIER, OutlierClassifier};
use crate::window::Windows;

/// Label of an anomalous point
pub const ANOMALY: u8 = 1;
/// Label of a normal point
pub const NORMAL: u8 = 0;

/// Mean squared difference of two equally long vectors
pub fn mean_squared_error(predicted: &[f64], target: &[f64]) -> f64 {
    if target.is_empty() {
        return 0.0;
    }
    predicted
        .iter()
        .zip(target)
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / target.len() as f64
}

/// Reconstruction error per dated target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreSeries {
    pub dates: Vec<NaiveDate>,
    pub errors: Vec<f64>,
}

impl ScoreSeries {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Score every window against its target
pub fn reconstruction_errors(
    windows: &Windows<'_>,
    predictions: &[Vec<f64>],
) -> Result<ScoreSeries, DetectError> {
    if predictions.len() != windows.len() {
        return Err(DetectError::inference(format!(
            "regressor returned {} predictions for {} windows",
            predictions.len(),
            windows.len()
        )));
    }

    let mut errors = Vec::with_capacity(predictions.len());
    for (i, (pred, target)) in predictions.iter().zip(&windows.targets).enumerate() {
        if pred.len() != target.len() {
            return Err(DetectError::inference(format!(
                "prediction {} has {} values, target has {}",
                i,
                pred.len(),
                target.len()
            )));
        }
        errors.push(mean_squared_error(pred, target));
    }

    Ok(ScoreSeries {
        dates: windows.dates.clone(),
        errors,
    })
}

/// One scored, labelled point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPoint {
    pub date: NaiveDate,
    pub error: f64,
    pub label: u8,
}

impl ScoredPoint {
    pub fn is_anomaly(&self) -> bool {
        self.label == ANOMALY
    }
}

/// Label every score with the classifier
pub fn classify(
    scores: &ScoreSeries,
    classifier: &dyn OutlierClassifier,
) -> Result<Vec<ScoredPoint>, DetectError> {
    let verdicts = classifier.predict(&scores.errors)?;
    if verdicts.len() != scores.len() {
        return Err(DetectError::inference(format!(
            "classifier returned {} verdicts for {} scores",
            verdicts.len(),
            scores.len()
        )));
    }

    scores
        .dates
        .iter()
        .zip(&scores.errors)
        .zip(verdicts)
        .map(|((&date, &error), verdict)| {
            let label = match verdict {
                OUTLIER => ANOMALY,
                INLIER => NORMAL,
                other => {
                    return Err(DetectError::inference(format!(
                        "classifier verdict {} is neither -1 nor 1",
                        other
                    )));
                }
            };
            Ok(ScoredPoint { date, error, label })
        })
        .collect()
}
