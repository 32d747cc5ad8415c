//! Observability configuration parsing from environment variables.

use anyhow::{Context, Result};

/// Observability environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            enabled: match lookup("OBSERVABILITY_ENABLED") {
                Some(v) => v
                    .parse::<bool>()
                    .with_context(|| format!("Invalid OBSERVABILITY_ENABLED: {}", v))?,
                None => defaults.enabled,
            },
            interval_seconds: match lookup("OBSERVABILITY_INTERVAL") {
                Some(v) => v
                    .parse::<u64>()
                    .with_context(|| format!("Invalid OBSERVABILITY_INTERVAL: {}", v))?,
                None => defaults.interval_seconds,
            },
        })
    }
}
