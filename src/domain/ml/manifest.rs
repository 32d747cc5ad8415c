//! Persisted dataset shape shared by the trainer and the server.
//!
//! The trainer writes this file next to the model artifact. The server
//! derives its request schema and column order from it, so both sides read
//! the same listing. Regenerate the manifest whenever the artifact changes.

use super::feature_spec::{DtypePolicy, FeatureSpec};
use crate::domain::errors::StartupError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub const DEFAULT_DATASET: &str = "US_Stocks_Financial_Indicators";
pub const DEFAULT_TARGET: &str = "class";
pub const DEFAULT_IMPUTATION: &str = "median";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestColumn {
    pub name: String,
    pub dtype: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureManifest {
    pub dataset: String,
    pub target: String,
    pub imputation: String,
    pub columns: Vec<ManifestColumn>,
}

impl FeatureManifest {
    pub fn new(columns: Vec<ManifestColumn>) -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            target: DEFAULT_TARGET.to_string(),
            imputation: DEFAULT_IMPUTATION.to_string(),
            columns,
        }
    }

    pub fn load(path: &Path) -> Result<Self, StartupError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StartupError::ManifestNotFound {
                path: path.to_path_buf(),
            },
            _ => StartupError::ManifestInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|e| StartupError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn feature_spec(&self, policy: DtypePolicy) -> Result<FeatureSpec, StartupError> {
        FeatureSpec::from_dtypes(
            self.columns
                .iter()
                .map(|c| (c.name.as_str(), c.dtype.as_str())),
            policy,
        )
    }
}
