//! Configuration module.
//!
//! Structured configuration loaded from environment variables, organized by
//! concern: Model, Server and Observability.

mod model_config;
mod observability_config;
mod server_config;

pub use model_config::{DEFAULT_MANIFEST_PATH, DEFAULT_MODEL_PATH, ModelEnvConfig};
pub use observability_config::ObservabilityEnvConfig;
pub use server_config::ServerEnvConfig;

use anyhow::{Context, Result};
use std::env;

/// Main service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub model: ModelEnvConfig,
    pub server: ServerEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (environment, map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            model: ModelEnvConfig::from_lookup(&lookup).context("Failed to load model config")?,
            server: ServerEnvConfig::from_lookup(&lookup)
                .context("Failed to load server config")?,
            observability: ObservabilityEnvConfig::from_lookup(&lookup)
                .context("Failed to load observability config")?,
        })
    }
}
