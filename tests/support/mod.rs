//! Shared fixtures: synthetic bars, CSV rendering and fake collaborators.

#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use ohlcv_sentinel::error::DetectError;
use ohlcv_sentinel::ingest::{Bar, feature_columns};
use ohlcv_sentinel::models::{
    FittedScaler, Forecaster, INLIER, OUTLIER, OutlierClassifier, SequenceRegressor,
};
use ohlcv_sentinel::registry::ModelRegistry;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Random-walk daily bars starting at `start`
pub fn synthetic_bars(n: usize, start: NaiveDate, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let returns = Normal::<f64>::new(0.0, 0.01).unwrap();
    let spread = Normal::<f64>::new(0.0, 0.005).unwrap();
    let volume = Normal::<f64>::new(1_000_000.0, 50_000.0).unwrap();

    let mut close: f64 = 100.0;
    (0..n)
        .map(|i| {
            let open = close;
            close *= 1.0 + returns.sample(&mut rng);
            let high = open.max(close) * (1.0 + spread.sample(&mut rng).abs());
            let low = open.min(close) * (1.0 - spread.sample(&mut rng).abs());
            Bar {
                date: start + Days::new(i as u64),
                open,
                high,
                low,
                close,
                volume: volume.sample(&mut rng).max(0.0).round(),
            }
        })
        .collect()
}

/// Bars with every value 1.0 except `spikes`, where every value is 50.0
pub fn flat_bars(n: usize, start: NaiveDate, spikes: &[NaiveDate]) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let date = start + Days::new(i as u64);
            let v = if spikes.contains(&date) { 50.0 } else { 1.0 };
            Bar {
                date,
                open: v,
                high: v,
                low: v,
                close: v,
                volume: v,
            }
        })
        .collect()
}

/// Render bars as CSV with a given header order
pub fn to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("Date,Open,High,Low,Close,Volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}

// ====== Fakes ======

pub struct IdentityScaler(pub Vec<String>);

impl FittedScaler for IdentityScaler {
    fn feature_names(&self) -> &[String] {
        &self.0
    }

    fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.to_vec()
    }
}

/// Forecasts zeros, so residuals equal the scaled input
pub struct ZeroForecaster(pub usize);

impl Forecaster for ZeroForecaster {
    fn order(&self) -> usize {
        self.0
    }

    fn forecast(&self, history: &[Vec<f64>], steps: usize) -> Result<Vec<Vec<f64>>, DetectError> {
        let width = history.first().map(|r| r.len()).unwrap_or(0);
        Ok(vec![vec![0.0; width]; steps])
    }
}

/// Predicts zeros, so the score is the target's mean square
pub struct ZeroRegressor;

impl SequenceRegressor for ZeroRegressor {
    fn predict(&self, batch: &[&[Vec<f64>]]) -> Result<Vec<Vec<f64>>, DetectError> {
        Ok(batch
            .iter()
            .map(|w| vec![0.0; w.last().map(|r| r.len()).unwrap_or(0)])
            .collect())
    }
}

/// Flags every score above the threshold
pub struct ThresholdClassifier(pub f64);

impl OutlierClassifier for ThresholdClassifier {
    fn predict(&self, scores: &[f64]) -> Result<Vec<i8>, DetectError> {
        Ok(scores
            .iter()
            .map(|&s| if s > self.0 { OUTLIER } else { INLIER })
            .collect())
    }
}

pub fn fake_registry(k: usize, threshold: f64) -> ModelRegistry {
    ModelRegistry::from_parts(
        IdentityScaler(feature_columns()),
        ZeroForecaster(k),
        IdentityScaler(feature_columns()),
        ZeroRegressor,
        ThresholdClassifier(threshold),
    )
}
