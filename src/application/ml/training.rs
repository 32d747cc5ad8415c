//! Produces the artifact/manifest pair the server consumes.
//!
//! Reads a CSV dataset, infers column dtypes, fits median imputation,
//! standard scaling and a random forest, and keeps the feature order of the
//! CSV header in both outputs.

use super::pipeline::{MedianImputer, PipelineModel, StandardScaler};
use crate::domain::ml::{FeatureManifest, ManifestColumn, StockLabel};
use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::io::Read;
use tracing::{debug, info};

/// Cells treated as missing values
const MISSING_MARKERS: &[&str] = &["", "?", "na", "nan", "null"];

/// Feature matrix with NaN for missing cells, plus encoded targets
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<i64>,
}

impl TrainingDataset {
    /// Parses a CSV with a header row. `target` names the label column;
    /// every other column is a feature, in header order.
    pub fn from_csv<R: Read>(reader: R, target: &str) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers().context("Failed to read CSV header")?.clone();

        let target_idx = headers
            .iter()
            .position(|h| h == target)
            .with_context(|| format!("Target column '{}' not found in header", target))?;

        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut rows = Vec::new();
        let mut targets = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("Malformed CSV record {}", line + 1))?;

            let label = record.get(target_idx).unwrap_or_default();
            targets.push(encode_target(label).with_context(|| {
                format!("Record {}: unknown target value '{}'", line + 1, label)
            })?);

            let mut row = Vec::with_capacity(feature_names.len());
            for (i, cell) in record.iter().enumerate() {
                if i == target_idx {
                    continue;
                }
                row.push(parse_cell(cell).with_context(|| {
                    format!(
                        "Record {}: column '{}' has non-numeric value '{}'",
                        line + 1,
                        headers.get(i).unwrap_or("?"),
                        cell
                    )
                })?);
            }
            rows.push(row);
        }

        if rows.is_empty() {
            bail!("Dataset has no records");
        }
        if feature_names.is_empty() {
            bail!("Dataset has no feature columns");
        }

        Ok(Self {
            feature_names,
            rows,
            targets,
        })
    }

    /// Per-column dtype: integral columns without missing cells are `int64`,
    /// everything else is `float64`.
    pub fn infer_dtypes(&self) -> Vec<&'static str> {
        (0..self.feature_names.len())
            .map(|col| {
                let integral = self
                    .rows
                    .iter()
                    .all(|r| r[col].is_finite() && r[col].fract() == 0.0);
                if integral { "int64" } else { "float64" }
            })
            .collect()
    }

    /// Every column as `float64`, the dtype of the imputed frame the
    /// pipeline is fit on.
    pub fn manifest(&self) -> FeatureManifest {
        self.manifest_with_dtypes(vec!["float64"; self.feature_names.len()])
    }

    /// Keeps `int64` for integral columns, so serving rejects fractional
    /// values there.
    pub fn manifest_with_integer_columns(&self) -> FeatureManifest {
        self.manifest_with_dtypes(self.infer_dtypes())
    }

    fn manifest_with_dtypes(&self, dtypes: Vec<&str>) -> FeatureManifest {
        FeatureManifest::new(
            self.feature_names
                .iter()
                .zip(dtypes)
                .map(|(name, dtype)| ManifestColumn {
                    name: name.clone(),
                    dtype: dtype.to_string(),
                })
                .collect(),
        )
    }

    pub fn class_counts(&self) -> (usize, usize) {
        let ones = self.targets.iter().filter(|t| **t == 1).count();
        (self.targets.len() - ones, ones)
    }
}

fn encode_target(raw: &str) -> Option<i64> {
    match raw.trim() {
        "0" => Some(0),
        "1" => Some(1),
        other => StockLabel::from_name(other).and_then(|l| l.code()),
    }
}

fn parse_cell(cell: &str) -> Result<f64> {
    let trimmed = cell.trim();
    if MISSING_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
        return Ok(f64::NAN);
    }
    Ok(trimmed.parse::<f64>()?)
}

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: u16,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub holdout_fraction: f64,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 3,
            min_samples_split: 2,
            holdout_fraction: 0.2,
            seed: 42,
        }
    }
}

pub struct TrainingReport {
    pub pipeline: PipelineModel,
    pub manifest: FeatureManifest,
    pub train_size: usize,
    pub holdout_size: usize,
    pub holdout_accuracy: Option<f64>,
}

/// Splits, fits the preprocessing steps and the forest, and scores the holdout.
pub fn train(dataset: &TrainingDataset, params: &ForestParams) -> Result<TrainingReport> {
    let n = dataset.rows.len();
    let n_features = dataset.feature_names.len();

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(params.seed);
    indices.shuffle(&mut rng);

    let holdout = ((n as f64) * params.holdout_fraction.clamp(0.0, 0.9)).floor() as usize;
    let (test_idx, train_idx) = indices.split_at(holdout);
    if train_idx.is_empty() {
        bail!("No training rows left after holdout split");
    }

    let mut x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| dataset.rows[i].clone()).collect();
    let y_train: Vec<i64> = train_idx.iter().map(|&i| dataset.targets[i]).collect();

    let imputer = MedianImputer::fit(&x_train, n_features);
    for row in x_train.iter_mut() {
        imputer.transform(row);
    }
    let scaler = StandardScaler::fit(&x_train, n_features);
    for row in x_train.iter_mut() {
        scaler.transform(row);
    }
    debug!(medians = ?imputer.medians, "Preprocessing fitted");

    let x_matrix =
        DenseMatrix::from_2d_vec(&x_train).map_err(|e| anyhow::anyhow!("Matrix error: {}", e))?;
    let forest_params = RandomForestClassifierParameters::default()
        .with_n_trees(params.n_trees.into())
        .with_max_depth(params.max_depth)
        .with_min_samples_split(params.min_samples_split);

    info!(
        "Training Random Forest Classifier (Trees: {}, Depth: {}, MinSplit: {}) on {} rows",
        params.n_trees,
        params.max_depth,
        params.min_samples_split,
        x_train.len()
    );
    let classifier = RandomForestClassifier::fit(&x_matrix, &y_train, forest_params)
        .map_err(|e| anyhow::anyhow!("Training error: {}", e))?;

    let pipeline = PipelineModel::new(dataset.feature_names.clone(), imputer, scaler, classifier);

    let holdout_accuracy = if test_idx.is_empty() {
        None
    } else {
        let x_test: Vec<Vec<f64>> = test_idx
            .iter()
            .map(|&i| pipeline.preprocess(&dataset.rows[i]))
            .collect();
        let predicted = pipeline.predict_matrix(&x_test)?;
        let correct = predicted
            .iter()
            .zip(test_idx)
            .filter(|(p, i)| **p == dataset.targets[**i])
            .count();
        Some(correct as f64 / test_idx.len() as f64)
    };

    Ok(TrainingReport {
        manifest: dataset.manifest(),
        pipeline,
        train_size: train_idx.len(),
        holdout_size: test_idx.len(),
        holdout_accuracy,
    })
}
