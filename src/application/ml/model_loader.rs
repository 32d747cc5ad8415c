use super::onnx_predictor::OnnxClassifier;
use super::pipeline::PipelineModel;
use super::predictor::ClassPredictor;
use crate::domain::errors::StartupError;
use crate::domain::ml::FeatureSpec;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Loads the model artifact once at startup.
///
/// `.onnx` files go through ONNX Runtime, anything else is read as a JSON
/// pipeline bundle. Both failure modes are fatal to the caller.
pub struct ModelLoader;

impl ModelLoader {
    pub fn load(path: &Path, spec: &FeatureSpec) -> Result<Arc<dyn ClassPredictor>, StartupError> {
        if !path.exists() {
            return Err(StartupError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        let model: Arc<dyn ClassPredictor> = if is_onnx(path) {
            let classifier = OnnxClassifier::load(path).map_err(|reason| {
                StartupError::ModelCorrupt {
                    path: path.to_path_buf(),
                    reason,
                }
            })?;
            Arc::new(classifier)
        } else {
            Arc::new(Self::load_pipeline(path)?)
        };

        check_contract(model.as_ref(), spec)?;

        info!(
            model = model.name(),
            path = %path.display(),
            n_features = spec.len(),
            "Model loaded"
        );
        Ok(model)
    }

    pub fn load_pipeline(path: &Path) -> Result<PipelineModel, StartupError> {
        let corrupt = |reason: String| StartupError::ModelCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StartupError::ModelNotFound {
                path: path.to_path_buf(),
            },
            _ => corrupt(e.to_string()),
        })?;

        let pipeline: PipelineModel =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| corrupt(e.to_string()))?;
        pipeline.check_consistency().map_err(corrupt)?;
        pipeline
            .warm_up()
            .map_err(|e| corrupt(format!("warm-up prediction failed: {}", e)))?;
        Ok(pipeline)
    }
}

fn is_onnx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("onnx"))
}

/// Feature count, and names when the artifact carries them, must agree with
/// the manifest. Column order is part of the contract.
fn check_contract(model: &dyn ClassPredictor, spec: &FeatureSpec) -> Result<(), StartupError> {
    match model.n_features() {
        Some(n) if n != spec.len() => {
            return Err(StartupError::FeatureContractMismatch {
                reason: format!(
                    "manifest has {} features, model expects {}",
                    spec.len(),
                    n
                ),
            });
        }
        Some(_) => {}
        None => warn!(
            model = model.name(),
            "Model does not record its input width; feature count was not checked"
        ),
    }

    match model.feature_names() {
        Some(names) => {
            if let Some((pos, (model_name, spec_name))) = names
                .iter()
                .zip(spec.names())
                .enumerate()
                .find(|(_, (m, s))| m.as_str() != *s)
            {
                return Err(StartupError::FeatureContractMismatch {
                    reason: format!(
                        "column {} is '{}' in the model but '{}' in the manifest",
                        pos, model_name, spec_name
                    ),
                });
            }
        }
        None => warn!(
            model = model.name(),
            "Model does not record feature names; column names were not checked"
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::pipeline::tests::{separable_pipeline, wide_forest_pipeline};
    use crate::domain::errors::PredictError;
    use crate::domain::ml::AlignedRow;
    use crate::domain::ml::DtypePolicy;
    use std::path::PathBuf;

    fn temp_path(name: &str, ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.{}", name, uuid::Uuid::new_v4(), ext))
    }

    fn spec(names: &[&str]) -> FeatureSpec {
        FeatureSpec::from_dtypes(
            names.iter().map(|n| (*n, "float64")),
            DtypePolicy::Permissive,
        )
        .unwrap()
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let err = ModelLoader::load(
            Path::new("/nonexistent/xgboost_model.json"),
            &spec(&["revenue", "assets"]),
        )
        .err()
        .unwrap();
        assert!(matches!(err, StartupError::ModelNotFound { .. }));
    }

    #[test]
    fn test_garbage_artifact_is_corrupt() {
        let path = temp_path("model-garbage", "json");
        std::fs::write(&path, b"\x00\x01 definitely not a model").unwrap();

        let err = ModelLoader::load(&path, &spec(&["revenue", "assets"]))
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::ModelCorrupt { .. }));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_garbage_onnx_is_corrupt() {
        let path = temp_path("model-garbage", "onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();

        let err = ModelLoader::load(&path, &spec(&["revenue", "assets"]))
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::ModelCorrupt { .. }));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_valid_pipeline_loads() {
        let path = temp_path("model-valid", "json");
        std::fs::write(&path, serde_json::to_vec(&separable_pipeline()).unwrap()).unwrap();

        let model = ModelLoader::load(&path, &spec(&["revenue", "assets"])).unwrap();
        assert_eq!(model.n_features(), Some(2));

        let _ = std::fs::remove_file(&path);
    }

    /// Backend that knows only its input width, like an ONNX graph
    struct WidthOnlyModel(Option<usize>);

    impl ClassPredictor for WidthOnlyModel {
        fn predict_class(&self, _row: &AlignedRow) -> Result<i64, PredictError> {
            Ok(0)
        }

        fn n_features(&self) -> Option<usize> {
            self.0
        }

        fn name(&self) -> &str {
            "width-only"
        }
    }

    #[test]
    fn test_forest_wider_than_names_is_corrupt() {
        let path = temp_path("model-wide", "json");
        std::fs::write(&path, serde_json::to_vec(&wide_forest_pipeline()).unwrap()).unwrap();

        let err = ModelLoader::load(&path, &spec(&["revenue", "assets"]))
            .err()
            .unwrap();
        match err {
            StartupError::ModelCorrupt { reason, .. } => assert!(reason.contains("warm-up")),
            other => panic!("unexpected error: {:?}", other),
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_graph_width_must_match_manifest() {
        let manifest = spec(&["revenue", "assets", "employees"]);

        let err = check_contract(&WidthOnlyModel(Some(5)), &manifest).unwrap_err();
        match err {
            StartupError::FeatureContractMismatch { reason } => {
                assert!(reason.contains("model expects 5"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(check_contract(&WidthOnlyModel(Some(3)), &manifest).is_ok());
        // Symbolic width: nothing to compare
        assert!(check_contract(&WidthOnlyModel(None), &manifest).is_ok());
    }

    #[test]
    fn test_feature_count_mismatch_rejected() {
        let path = temp_path("model-count", "json");
        std::fs::write(&path, serde_json::to_vec(&separable_pipeline()).unwrap()).unwrap();

        let err = ModelLoader::load(&path, &spec(&["revenue", "assets", "employees"]))
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::FeatureContractMismatch { .. }));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_feature_order_mismatch_rejected() {
        let path = temp_path("model-order", "json");
        std::fs::write(&path, serde_json::to_vec(&separable_pipeline()).unwrap()).unwrap();

        let err = ModelLoader::load(&path, &spec(&["assets", "revenue"]))
            .err()
            .unwrap();
        match err {
            StartupError::FeatureContractMismatch { reason } => {
                assert!(reason.contains("column 0"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let _ = std::fs::remove_file(&path);
    }
}
