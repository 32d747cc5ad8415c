use serde_json::json;
use std::fs::File;
use std::path::PathBuf;
use stock_predict::application::ml::training::{ForestParams, TrainingDataset, train};
use stock_predict::application::prediction::{PredictionService, Readiness, ServiceState};
use stock_predict::domain::errors::StartupError;
use stock_predict::domain::ml::{DtypePolicy, FeatureManifest, ManifestColumn, StockLabel};
use stock_predict::infrastructure::observability::Metrics;
use uuid::Uuid;

/// Scratch directory removed when dropped
struct Workdir(PathBuf);

impl Workdir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("stock_predict_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn training_csv() -> String {
    let mut csv = String::from("revenue,debt_ratio,employees,class\n");
    for i in 0..40 {
        csv.push_str(&format!("{}.5,0.{},{},0\n", i, i % 9 + 1, 10 + i));
        csv.push_str(&format!("{}.5,0.{},{},1\n", 900 + i, i % 9 + 1, 2000 + i));
    }
    csv
}

/// Trains a small forest and writes the artifact/manifest pair
fn write_artifacts(dir: &Workdir) -> (PathBuf, PathBuf, FeatureManifest) {
    let dataset = TrainingDataset::from_csv(training_csv().as_bytes(), "class").unwrap();
    let params = ForestParams {
        n_trees: 15,
        holdout_fraction: 0.0,
        ..Default::default()
    };
    let report = train(&dataset, &params).unwrap();

    let model_path = dir.path("xgboost_model.json");
    let manifest_path = dir.path("feature_manifest.json");
    serde_json::to_writer(File::create(&model_path).unwrap(), &report.pipeline).unwrap();
    report.manifest.save(&manifest_path).unwrap();

    (model_path, manifest_path, report.manifest)
}

#[test]
fn test_initialize_from_trained_artifacts() {
    let dir = Workdir::new();
    let (model_path, manifest_path, _) = write_artifacts(&dir);

    let state =
        ServiceState::initialize(&manifest_path, &model_path, DtypePolicy::Strict).unwrap();
    assert_eq!(state.readiness(), Readiness::Ready);
    assert_eq!(state.n_features(), Some(3));
    assert_eq!(
        state.spec().unwrap().names().collect::<Vec<_>>(),
        vec!["revenue", "debt_ratio", "employees"]
    );

    let service = PredictionService::new(state, Metrics::new().unwrap());
    let high = service
        .predict(&json!({"employees": 2010, "debt_ratio": 0.4, "revenue": 910.5}))
        .unwrap();
    let low = service
        .predict(&json!({"employees": 12, "debt_ratio": 0.4, "revenue": 2.5}))
        .unwrap();
    assert_eq!(high.label, StockLabel::StockValueIncrease);
    assert_eq!(low.label, StockLabel::StockValueDecrease);
}

#[test]
fn test_missing_model_is_fatal() {
    let dir = Workdir::new();
    let (_, manifest_path, _) = write_artifacts(&dir);

    let result = ServiceState::initialize(
        &manifest_path,
        &dir.path("absent_model.json"),
        DtypePolicy::Permissive,
    );
    assert!(matches!(result, Err(StartupError::ModelNotFound { .. })));
}

#[test]
fn test_corrupt_model_is_fatal() {
    let dir = Workdir::new();
    let (model_path, manifest_path, _) = write_artifacts(&dir);
    std::fs::write(&model_path, b"{\"format_version\": 1, \"feature_names\": [").unwrap();

    let result = ServiceState::initialize(&manifest_path, &model_path, DtypePolicy::Permissive);
    assert!(matches!(result, Err(StartupError::ModelCorrupt { .. })));
}

#[test]
fn test_reordered_manifest_breaks_contract() {
    let dir = Workdir::new();
    let (model_path, manifest_path, mut manifest) = write_artifacts(&dir);
    manifest.columns.swap(0, 1);
    manifest.save(&manifest_path).unwrap();

    let result = ServiceState::initialize(&manifest_path, &model_path, DtypePolicy::Permissive);
    assert!(matches!(
        result,
        Err(StartupError::FeatureContractMismatch { .. })
    ));
}

#[test]
fn test_empty_manifest_is_fatal() {
    let dir = Workdir::new();
    let (model_path, manifest_path, _) = write_artifacts(&dir);
    FeatureManifest::new(Vec::new()).save(&manifest_path).unwrap();

    let result = ServiceState::initialize(&manifest_path, &model_path, DtypePolicy::Permissive);
    assert!(matches!(result, Err(StartupError::EmptyFeatureSpec)));
}

#[test]
fn test_strict_policy_rejects_unknown_dtype() {
    let dir = Workdir::new();
    let (model_path, manifest_path, mut manifest) = write_artifacts(&dir);
    manifest.columns[2] = ManifestColumn {
        name: "employees".to_string(),
        dtype: "category".to_string(),
    };
    manifest.save(&manifest_path).unwrap();

    let strict = ServiceState::initialize(&manifest_path, &model_path, DtypePolicy::Strict);
    assert!(matches!(strict, Err(StartupError::UnsupportedDtype { .. })));

    let permissive =
        ServiceState::initialize(&manifest_path, &model_path, DtypePolicy::Permissive).unwrap();
    assert_eq!(permissive.spec().unwrap().opaque_columns().len(), 1);
}
