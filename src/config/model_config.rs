//! Model artifact and feature manifest locations.

use crate::domain::ml::DtypePolicy;
use anyhow::Result;
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "xgboost_model.json";
pub const DEFAULT_MANIFEST_PATH: &str = "feature_manifest.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEnvConfig {
    pub model_path: PathBuf,
    pub manifest_path: PathBuf,
    pub dtype_policy: DtypePolicy,
}

impl ModelEnvConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let dtype_policy = match lookup("DTYPE_POLICY") {
            Some(v) => v.parse::<DtypePolicy>()?,
            None => DtypePolicy::default(),
        };

        Ok(Self {
            model_path: lookup("MODEL_PATH")
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string())
                .into(),
            manifest_path: lookup("FEATURE_MANIFEST_PATH")
                .unwrap_or_else(|| DEFAULT_MANIFEST_PATH.to_string())
                .into(),
            dtype_policy,
        })
    }
}
