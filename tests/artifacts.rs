mod support;

use ohlcv_sentinel::algo::{
    Activation, DenseLayer, IsolationForest, IsolationTree, LstmLayer, LstmRegressor, TreeNode,
    VarModel,
};
use ohlcv_sentinel::artifact::{Artifact, ArtifactKind};
use ohlcv_sentinel::config::{ArtifactPaths, SentinelConfig};
use ohlcv_sentinel::error::LoadError;
use ohlcv_sentinel::ingest::feature_columns;
use ohlcv_sentinel::payload::DetectionResponse;
use ohlcv_sentinel::runtime::Sentinel;
use ohlcv_sentinel::scaler::AffineScaler;
use std::path::{Path, PathBuf};
use support::*;

const D: usize = 5;
const UNITS: usize = 4;

fn var_model() -> VarModel {
    // damped persistence on lag 1, small pull from lag 2
    let mut lag1 = vec![vec![0.0; D]; D];
    let mut lag2 = vec![vec![0.0; D]; D];
    for i in 0..D {
        lag1[i][i] = 0.8;
        lag2[i][i] = 0.1;
    }
    VarModel {
        feature_names: feature_columns(),
        k_ar: 2,
        intercept: vec![0.0; D],
        coefs: vec![lag1, lag2],
    }
}

/// Centres the flat 1.0 level on zero
fn var_scaler() -> AffineScaler {
    AffineScaler::standard(feature_columns(), vec![1.0; D], vec![1.0; D])
}

/// Maps a 50.0 spike residual (49 after centring) onto 1.0
fn lstm_scaler() -> AffineScaler {
    AffineScaler::min_max(feature_columns(), vec![1.0 / 49.0; D], vec![0.0; D])
}

/// Deterministic small weights, varied by position
fn weights(rows: usize, cols: usize, salt: f64) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| (((r * cols + c) as f64 + salt) * 0.37).sin() * 0.2)
                .collect()
        })
        .collect()
}

fn lstm_model() -> LstmRegressor {
    LstmRegressor {
        lstm: vec![LstmLayer {
            units: UNITS,
            kernel: weights(D, 4 * UNITS, 1.0),
            recurrent_kernel: weights(UNITS, 4 * UNITS, 2.0),
            bias: vec![0.0; 4 * UNITS],
        }],
        dense: vec![DenseLayer {
            kernel: weights(UNITS, D, 3.0),
            bias: vec![0.0; D],
            activation: Activation::Linear,
        }],
    }
}

/// Two trees: one isolates errors above 0.8, one is a single leaf.
///
/// A window of zeros keeps the LSTM state at zero, so a spike target scores
/// exactly its own mean square (1.0). Every other window stays well below
/// 0.8 because the dense head has at most four weights of magnitude 0.2.
fn forest() -> IsolationForest {
    IsolationForest {
        max_samples: 256,
        offset: -0.5,
        n_features: 1,
        trees: vec![
            IsolationTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 0.8,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { n_samples: 250 },
                    TreeNode::Leaf { n_samples: 2 },
                ],
            },
            IsolationTree {
                nodes: vec![TreeNode::Leaf { n_samples: 256 }],
            },
        ],
    }
}

/// Write every artifact under `dir`, mixing JSON and bincode
fn write_artifacts(dir: &Path) -> SentinelConfig {
    std::fs::create_dir_all(dir.join("models")).unwrap();
    std::fs::create_dir_all(dir.join("scalers")).unwrap();

    let artifacts = ArtifactPaths {
        var_model: PathBuf::from("models/var_model.bin"),
        lstm_model: PathBuf::from("models/lstm_model.bin"),
        ..ArtifactPaths::default()
    };
    let config = SentinelConfig {
        artifacts,
        ..SentinelConfig::default()
    }
    .with_model_dir(dir);

    let a = &config.artifacts;
    Artifact::new(ArtifactKind::Forecaster, var_model())
        .write(&config.resolve(&a.var_model))
        .unwrap();
    Artifact::new(ArtifactKind::Scaler, var_scaler())
        .write(&config.resolve(&a.var_scaler))
        .unwrap();
    Artifact::new(ArtifactKind::Scaler, lstm_scaler())
        .write(&config.resolve(&a.lstm_scaler))
        .unwrap();
    Artifact::new(ArtifactKind::SequenceRegressor, lstm_model())
        .write(&config.resolve(&a.lstm_model))
        .unwrap();
    Artifact::new(ArtifactKind::OutlierClassifier, forest())
        .write(&config.resolve(&a.isolation_forest))
        .unwrap();

    config
}

#[test]
fn test_loaded_models_flag_injected_spikes() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_artifacts(dir.path());
    let sentinel = Sentinel::load(&config).unwrap();

    let summary = sentinel.registry().summary();
    assert_eq!(summary.forecaster_order, 2);
    assert_eq!(summary.features, feature_columns());
    assert!(summary.regressor_reentrant);

    let spikes = [date(2023, 2, 15), date(2023, 4, 10)];
    let csv = to_csv(&flat_bars(150, date(2023, 1, 1), &spikes));
    let first = sentinel.run(&csv);
    assert_eq!(first, sentinel.run(&csv));

    let response: DetectionResponse = serde_json::from_str(&first).unwrap();
    match response {
        DetectionResponse::Success {
            anomalies,
            eda,
            recent,
            pie,
            anomalies_count,
        } => {
            assert_eq!(eda.len(), 150);
            assert_eq!(anomalies_count, 2);
            let flagged: Vec<&str> = recent.iter().map(|r| r.date.as_str()).collect();
            assert_eq!(flagged, vec!["2023-02-15", "2023-04-10"]);
            for row in &anomalies {
                assert_eq!(row.close, 50.0);
                assert!(eda.contains(row));
            }
            assert_eq!(pie.total_points, 150);
            assert_eq!(pie.anomalies, 2);
            assert_eq!(pie.percentages.anomalies, 1.33);
            assert_eq!(pie.percentages.normal, 98.67);
        }
        other => panic!("unexpected response {:?}", other),
    }
}

#[test]
fn test_loaded_models_leave_flat_series_unflagged() {
    let dir = tempfile::tempdir().unwrap();
    let sentinel = Sentinel::load(&write_artifacts(dir.path())).unwrap();

    let csv = to_csv(&flat_bars(60, date(2023, 1, 1), &[]));
    let json: serde_json::Value = serde_json::from_str(&sentinel.run(&csv)).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["anomalies_count"], 0);
    assert_eq!(json["pie"]["total_points"], 60);
}

#[test]
fn test_missing_artifact_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_artifacts(dir.path());
    std::fs::remove_file(config.resolve(&config.artifacts.lstm_scaler)).unwrap();

    match Sentinel::load(&config) {
        Err(LoadError::Io { artifact, .. }) => assert!(artifact.ends_with("lstm_scaler.json")),
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("load should fail"),
    }
}

#[test]
fn test_incompatible_regressor_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_artifacts(dir.path());

    let mut narrow = lstm_model();
    narrow.dense[0] = DenseLayer {
        kernel: weights(UNITS, 3, 4.0),
        bias: vec![0.0; 3],
        activation: Activation::Linear,
    };
    Artifact::new(ArtifactKind::SequenceRegressor, narrow)
        .write(&config.resolve(&config.artifacts.lstm_model))
        .unwrap();

    assert!(matches!(
        Sentinel::load(&config),
        Err(LoadError::Invalid { .. })
    ));
}

#[test]
fn test_malformed_var_coefficients_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_artifacts(dir.path());

    let mut broken = var_model();
    broken.coefs.pop();
    Artifact::new(ArtifactKind::Forecaster, broken)
        .write(&config.resolve(&config.artifacts.var_model))
        .unwrap();

    assert!(matches!(
        Sentinel::load(&config),
        Err(LoadError::Invalid { .. })
    ));
}
