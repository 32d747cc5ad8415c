//! Stock Predict Server - HTTP prediction endpoint
//!
//! Loads the feature manifest and model artifact, then serves `/predict`
//! and `/health`. Any startup failure exits before the listener is bound.
//!
//! # Usage
//! ```sh
//! MODEL_PATH=xgboost_model.json FEATURE_MANIFEST_PATH=feature_manifest.json cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `MODEL_PATH` - Model artifact, `.onnx` or JSON pipeline (default: xgboost_model.json)
//! - `FEATURE_MANIFEST_PATH` - Feature manifest (default: feature_manifest.json)
//! - `DTYPE_POLICY` - `permissive` or `strict` handling of unknown dtypes
//! - `BIND_ADDRESS` / `PORT` - Listener address (default: 0.0.0.0:8000)
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)
//! - `OBSERVABILITY_INTERVAL` - Interval in seconds between metric outputs (default: 60)

use anyhow::{Context, Result};
use std::sync::Arc;
use stock_predict::application::prediction::{PredictionService, ServiceState};
use stock_predict::config::Config;
use stock_predict::infrastructure::observability::{Metrics, MetricsReporter};
use stock_predict::interfaces::router;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Stock Predict Server {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: model={:?}, manifest={:?}, policy={:?}",
        config.model.model_path, config.model.manifest_path, config.model.dtype_policy
    );

    let state = ServiceState::initialize(
        &config.model.manifest_path,
        &config.model.model_path,
        config.model.dtype_policy,
    )
    .context("Service state initialization failed")?;

    let metrics = Metrics::new()?;
    let service = Arc::new(PredictionService::new(state, metrics));

    if config.observability.enabled {
        let reporter = MetricsReporter::new(service.clone(), config.observability.interval_seconds);
        tokio::spawn(async move {
            reporter.run().await;
        });
        info!(
            "Metrics reporter started (interval: {}s)",
            config.observability.interval_seconds
        );
    } else {
        info!("Metrics reporting disabled.");
    }

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received. Draining connections...");
}
