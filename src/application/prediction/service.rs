use super::state::ServiceState;
use crate::domain::errors::ServiceError;
use crate::domain::ml::{InputRecord, PredictionOutcome};
use crate::infrastructure::observability::Metrics;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Payload of the health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_loaded: bool,
    pub n_features: Option<usize>,
}

/// Request-handling core: validate, align, predict, label.
pub struct PredictionService {
    state: ServiceState,
    metrics: Metrics,
}

impl PredictionService {
    pub fn new(state: ServiceState, metrics: Metrics) -> Self {
        metrics
            .model_loaded
            .set(if state.model_loaded() { 1.0 } else { 0.0 });
        Self { state, metrics }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Validates `body` by name, aligns it in training column order and runs
    /// the model. The model is not invoked unless validation passes.
    pub fn predict(&self, body: &Value) -> Result<PredictionOutcome, ServiceError> {
        let (Some(spec), Some(schema), Some(model)) =
            (self.state.spec(), self.state.schema(), self.state.model())
        else {
            return Err(ServiceError::NotReady);
        };

        let started = Instant::now();

        let record = InputRecord::validate(body, schema).map_err(|e| {
            self.metrics.validation_failures_total.inc();
            debug!(error = %e, "Rejected prediction request");
            e
        })?;
        if !record.ignored_fields().is_empty() {
            debug!(fields = ?record.ignored_fields(), "Ignoring unknown request fields");
        }

        let row = record.align(spec)?;

        let code = model.predict_class(&row).map_err(|e| {
            self.metrics.model_errors_total.inc();
            error!(model = model.name(), error = %e, "Model invocation failed");
            e
        })?;

        let outcome = PredictionOutcome::from_code(code);
        if outcome.is_unmapped() {
            warn!(code, "Model returned a class code outside the label set");
        }

        self.metrics.inc_predictions(outcome.label.as_str());
        self.metrics
            .prediction_latency_seconds
            .observe(started.elapsed().as_secs_f64());

        Ok(outcome)
    }

    /// Liveness and readiness in one payload. Never fails.
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            model_loaded: self.state.model_loaded(),
            n_features: self.state.n_features(),
        }
    }
}
