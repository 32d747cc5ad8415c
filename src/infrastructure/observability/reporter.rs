//! Push-based metrics reporter
//!
//! Periodically outputs a structured JSON snapshot to stdout.

use crate::application::prediction::PredictionService;
use crate::domain::ml::StockLabel;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

/// Metrics snapshot for JSON output
#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub model_loaded: bool,
    pub n_features: Option<usize>,
    pub predictions: PredictionCounts,
    pub validation_failures: u64,
    pub model_errors: u64,
}

#[derive(Serialize)]
pub struct PredictionCounts {
    pub stock_value_decrease: u64,
    pub stock_value_increase: u64,
    pub unknown: u64,
}

/// Outputs metrics as structured JSON logs on a configurable interval.
pub struct MetricsReporter {
    service: Arc<PredictionService>,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(service: Arc<PredictionService>, interval_seconds: u64) -> Self {
        Self {
            service,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds),
        }
    }

    /// Run the reporter in a loop, outputting metrics periodically
    pub async fn run(self) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::time::sleep(self.interval).await;

            let snapshot = self.collect_snapshot();
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    // Prefixed so log shippers can filter it
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Predictions: {} up / {} down / {} unknown | Rejected: {} | Uptime: {}s",
                        snapshot.predictions.stock_value_increase,
                        snapshot.predictions.stock_value_decrease,
                        snapshot.predictions.unknown,
                        snapshot.validation_failures,
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("Failed to serialize metrics: {}", e),
            }
            trace!("Prometheus exposition:\n{}", self.service.metrics().render());
        }
    }

    /// Collect current metrics snapshot
    fn collect_snapshot(&self) -> MetricsSnapshot {
        let metrics = self.service.metrics();
        let health = self.service.health();
        let uptime = self.start_time.elapsed().as_secs();

        metrics.uptime_seconds.set(uptime as f64);

        let count = |label: StockLabel| metrics.prediction_count(label.as_str()) as u64;

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            model_loaded: health.model_loaded,
            n_features: health.n_features,
            predictions: PredictionCounts {
                stock_value_decrease: count(StockLabel::StockValueDecrease),
                stock_value_increase: count(StockLabel::StockValueIncrease),
                unknown: count(StockLabel::Unknown),
            },
            validation_failures: metrics.validation_failures_total.get() as u64,
            model_errors: metrics.model_errors_total.get() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prediction::ServiceState;
    use crate::infrastructure::observability::Metrics;

    #[test]
    fn test_snapshot_of_unready_service() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_predictions("stock_value_increase");
        metrics.validation_failures_total.inc();

        let service = Arc::new(PredictionService::new(ServiceState::uninitialized(), metrics));
        let reporter = MetricsReporter::new(service, 60);

        let snapshot = reporter.collect_snapshot();
        assert!(!snapshot.model_loaded);
        assert_eq!(snapshot.n_features, None);
        assert_eq!(snapshot.predictions.stock_value_increase, 1);
        assert_eq!(snapshot.predictions.unknown, 0);
        assert_eq!(snapshot.validation_failures, 1);
        assert!(!snapshot.timestamp.is_empty());
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = MetricsSnapshot {
            timestamp: "2026-01-10T10:00:00Z".to_string(),
            uptime_seconds: 3600,
            version: "0.3.1".to_string(),
            model_loaded: true,
            n_features: Some(62),
            predictions: PredictionCounts {
                stock_value_decrease: 10,
                stock_value_increase: 12,
                unknown: 0,
            },
            validation_failures: 3,
            model_errors: 0,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"n_features\":62"));
        assert!(json.contains("\"stock_value_increase\":12"));
    }
}
