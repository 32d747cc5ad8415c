use super::predictor::ClassPredictor;
use crate::domain::errors::PredictError;
use crate::domain::ml::AlignedRow;
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// Classifier exported to ONNX (e.g. XGBoost via onnxmltools).
///
/// The first output is read as the predicted label tensor. The input width
/// comes from the graph itself; a symbolic last dimension leaves it unknown
/// and the feature count unchecked at startup.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_width: Option<usize>,
}

impl OnnxClassifier {
    pub fn load(model_path: &Path) -> Result<Self, String> {
        let session = Session::builder()
            .map_err(|e| format!("Failed to create ONNX session builder: {}", e))?
            .commit_from_file(model_path)
            .map_err(|e| format!("Failed to load ONNX model: {}", e))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| "ONNX graph declares no inputs".to_string())?;
        let input_width = input
            .input_type
            .tensor_shape()
            .and_then(|shape| fixed_width(shape));

        match input_width {
            Some(width) => info!(
                input = %input.name,
                width,
                "Successfully loaded ONNX model from {:?}",
                model_path
            ),
            None => warn!(
                input = %input.name,
                "ONNX input width is symbolic; feature count cannot be checked against the manifest"
            ),
        }

        Ok(Self {
            session: Mutex::new(session),
            input_width,
        })
    }
}

/// Last dimension of a tensor shape when it is fixed. ONNX marks symbolic
/// dimensions with -1.
fn fixed_width(dims: &[i64]) -> Option<usize> {
    dims.last()
        .filter(|d| **d > 0)
        .and_then(|d| usize::try_from(*d).ok())
}

impl ClassPredictor for OnnxClassifier {
    fn predict_class(&self, row: &AlignedRow) -> Result<i64, PredictError> {
        if let Some(expected) = self.input_width {
            if row.len() != expected {
                return Err(PredictError::ShapeMismatch {
                    expected,
                    actual: row.len(),
                });
            }
        }

        let mut session = self
            .session
            .lock()
            .map_err(|e| PredictError::Backend(format!("Mutex lock failed: {}", e)))?;

        let shape = vec![1, row.len()];
        let input_value = ort::value::Value::from_array((shape.as_slice(), row.to_f32()))
            .map_err(|e| PredictError::Backend(format!("Input value creation failed: {}", e)))?;

        let inputs = ort::inputs![input_value];

        let outputs = session
            .run(inputs)
            .map_err(|e| PredictError::Backend(e.to_string()))?;
        let label_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or(PredictError::EmptyOutput)?;
        let data = label_value
            .try_extract_tensor::<i64>()
            .map_err(|e| PredictError::Backend(e.to_string()))?;
        data.1.iter().next().copied().ok_or(PredictError::EmptyOutput)
    }

    fn n_features(&self) -> Option<usize> {
        self.input_width
    }

    fn name(&self) -> &str {
        "ONNX Runtime classifier"
    }
}
