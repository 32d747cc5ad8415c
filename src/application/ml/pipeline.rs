//! JSON pipeline artifact: median imputer, standard scaler and a smartcore
//! random forest, bundled with the feature names they were fit on.

use super::predictor::ClassPredictor;
use crate::domain::errors::PredictError;
use crate::domain::ml::AlignedRow;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::panic::{self, AssertUnwindSafe};

pub const PIPELINE_FORMAT_VERSION: u32 = 1;

pub type ForestClassifier = RandomForestClassifier<f64, i64, DenseMatrix<f64>, Vec<i64>>;

/// Replaces non-finite values with per-column training medians
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianImputer {
    pub medians: Vec<f64>,
}

impl MedianImputer {
    /// Fits on rows that may contain NaN for missing cells
    pub fn fit(rows: &[Vec<f64>], n_features: usize) -> Self {
        let medians = (0..n_features)
            .map(|col| {
                let mut present: Vec<f64> = rows
                    .iter()
                    .map(|r| r[col])
                    .filter(|v| v.is_finite())
                    .collect();
                median(&mut present)
            })
            .collect();
        Self { medians }
    }

    pub fn transform(&self, row: &mut [f64]) {
        for (v, m) in row.iter_mut().zip(&self.medians) {
            if !v.is_finite() {
                *v = *m;
            }
        }
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Zero-mean, unit-variance scaling per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>], n_features: usize) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = vec![0.0; n_features];
        let mut scale = vec![0.0; n_features];

        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        for row in rows {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }
        // Constant columns keep a unit scale
        for s in scale.iter_mut() {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }

        Self { mean, scale }
    }

    pub fn transform(&self, row: &mut [f64]) {
        for ((v, m), s) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            *v = (*v - m) / s;
        }
    }
}

/// Serialized training pipeline
#[derive(Serialize, Deserialize)]
pub struct PipelineModel {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub imputer: MedianImputer,
    pub scaler: StandardScaler,
    pub classifier: ForestClassifier,
}

impl PipelineModel {
    pub fn new(
        feature_names: Vec<String>,
        imputer: MedianImputer,
        scaler: StandardScaler,
        classifier: ForestClassifier,
    ) -> Self {
        Self {
            format_version: PIPELINE_FORMAT_VERSION,
            feature_names,
            imputer,
            scaler,
            classifier,
        }
    }

    /// Checks the bundled preprocessing steps agree on the feature count
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.format_version != PIPELINE_FORMAT_VERSION {
            return Err(format!(
                "unsupported format_version {} (expected {})",
                self.format_version, PIPELINE_FORMAT_VERSION
            ));
        }
        let n = self.feature_names.len();
        if n == 0 {
            return Err("pipeline has no feature names".to_string());
        }
        if self.imputer.medians.len() != n
            || self.scaler.mean.len() != n
            || self.scaler.scale.len() != n
        {
            return Err(format!(
                "preprocessing width disagrees with {} feature names",
                n
            ));
        }
        Ok(())
    }

    /// Applies imputation and scaling to a raw row
    pub fn preprocess(&self, values: &[f64]) -> Vec<f64> {
        let mut row = values.to_vec();
        self.imputer.transform(&mut row);
        self.scaler.transform(&mut row);
        row
    }

    /// Predicts class codes for already preprocessed rows
    pub fn predict_matrix(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>, PredictError> {
        let matrix = DenseMatrix::from_2d_vec(&rows.to_vec())
            .map_err(|e| PredictError::Backend(format!("Matrix creation failed: {}", e)))?;
        // smartcore panics instead of erroring when the row is narrower than the fit
        panic::catch_unwind(AssertUnwindSafe(|| self.classifier.predict(&matrix)))
            .map_err(|_| PredictError::Backend("classifier panicked on input".to_string()))?
            .map_err(|e| PredictError::Backend(format!("Prediction failed: {}", e)))
    }

    /// Runs one all-zero row through imputation, scaling and the forest.
    ///
    /// Catches a classifier fit on a different width than `feature_names`.
    pub fn warm_up(&self) -> Result<(), PredictError> {
        let row = self.preprocess(&vec![0.0; self.feature_names.len()]);
        self.predict_matrix(&[row]).map(|_| ())
    }
}

impl ClassPredictor for PipelineModel {
    fn predict_class(&self, row: &AlignedRow) -> Result<i64, PredictError> {
        let expected = self.feature_names.len();
        if row.len() != expected {
            return Err(PredictError::ShapeMismatch {
                expected,
                actual: row.len(),
            });
        }

        let input = self.preprocess(row.values());
        let predictions = self.predict_matrix(&[input])?;
        predictions.first().copied().ok_or(PredictError::EmptyOutput)
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.feature_names.len())
    }

    fn feature_names(&self) -> Option<&[String]> {
        Some(&self.feature_names)
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest pipeline"
    }
}
