//! Prometheus metrics definitions for the prediction service
//!
//! All metrics use the `stock_predict_` prefix.

use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the prediction service
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Predictions served, by resolved label
    pub predictions_total: CounterVec,
    /// Requests rejected by schema validation
    pub validation_failures_total: Counter,
    /// Model invocations that failed at runtime
    pub model_errors_total: Counter,
    /// Time spent aligning and running the model
    pub prediction_latency_seconds: Histogram,
    /// Model loaded (0=no, 1=yes)
    pub model_loaded: GenericGauge<AtomicF64>,
    /// Uptime in seconds
    pub uptime_seconds: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = CounterVec::new(
            Opts::new(
                "stock_predict_predictions_total",
                "Total predictions served by label",
            ),
            &["label"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let validation_failures_total = Counter::with_opts(Opts::new(
            "stock_predict_validation_failures_total",
            "Total requests rejected by schema validation",
        ))?;
        registry.register(Box::new(validation_failures_total.clone()))?;

        let model_errors_total = Counter::with_opts(Opts::new(
            "stock_predict_model_errors_total",
            "Total model invocation failures",
        ))?;
        registry.register(Box::new(model_errors_total.clone()))?;

        let prediction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "stock_predict_prediction_latency_seconds",
                "Prediction latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
            ]),
        )?;
        registry.register(Box::new(prediction_latency_seconds.clone()))?;

        let model_loaded = Gauge::with_opts(Opts::new(
            "stock_predict_model_loaded",
            "Model loaded (0=no, 1=yes)",
        ))?;
        registry.register(Box::new(model_loaded.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "stock_predict_uptime_seconds",
            "Server uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            validation_failures_total,
            model_errors_total,
            prediction_latency_seconds,
            model_loaded,
            uptime_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    /// Increment the per-label prediction counter
    pub fn inc_predictions(&self, label: &str) {
        self.predictions_total.with_label_values(&[label]).inc();
    }

    pub fn prediction_count(&self, label: &str) -> f64 {
        self.predictions_total.with_label_values(&[label]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.validation_failures_total.inc();
        assert!(metrics.render().contains("stock_predict_"));
    }

    #[test]
    fn test_prediction_counter_per_label() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_predictions("stock_value_increase");
        metrics.inc_predictions("stock_value_increase");
        metrics.inc_predictions("Unknown");

        assert_eq!(metrics.prediction_count("stock_value_increase"), 2.0);
        assert_eq!(metrics.prediction_count("Unknown"), 1.0);

        let output = metrics.render();
        assert!(output.contains("stock_predict_predictions_total"));
        assert!(output.contains("stock_value_increase"));
    }

    #[test]
    fn test_model_loaded_gauge() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.model_loaded.set(1.0);
        let output = metrics.render();
        assert!(output.contains("stock_predict_model_loaded 1"));
    }
}
