//! Smoke test for a running server: builds a random record from the feature
//! manifest, checks `/health`, then posts it to `/predict`.

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use stock_predict::config::DEFAULT_MANIFEST_PATH;
use stock_predict::domain::ml::{DtypePolicy, FeatureKind, FeatureManifest, FeatureSpec};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the prediction server
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    base_url: String,

    /// Feature manifest used to shape the request
    #[arg(long, default_value = DEFAULT_MANIFEST_PATH)]
    manifest: PathBuf,
}

fn sample_record(spec: &FeatureSpec, rng: &mut impl Rng) -> Map<String, Value> {
    spec.columns()
        .iter()
        .map(|c| {
            let value = match c.kind {
                FeatureKind::Float => Value::from(rng.random_range(0.01..1000.0)),
                FeatureKind::Integer => Value::from(rng.random_range(0..=100i64)),
                FeatureKind::Opaque(_) => Value::from(0.0),
            };
            (c.name.clone(), value)
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("smoke_client=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let manifest = FeatureManifest::load(&args.manifest)?;
    let spec = manifest.feature_spec(DtypePolicy::Permissive)?;
    let record = sample_record(&spec, &mut rand::rng());
    info!(
        "Sample input data:\n{}",
        serde_json::to_string_pretty(&record)?
    );

    let client = reqwest::Client::new();
    let health_url = format!("{}/health", args.base_url);
    let predict_url = format!("{}/predict", args.base_url);

    let health = match client
        .get(&health_url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) if e.is_connect() => {
            error!(
                "Could not connect to the prediction service at {}. Is the server running?",
                args.base_url
            );
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if health.status().is_success() {
        let body: Value = health.json().await.context("Invalid health response")?;
        info!("Health response: {}", body);
        if body.get("model_loaded") != Some(&Value::Bool(true)) {
            warn!("Service is up but reports no loaded model");
        }
    } else {
        warn!(
            "Health check failed: {} - {}",
            health.status(),
            health.text().await.unwrap_or_default()
        );
    }

    let response = client
        .post(&predict_url)
        .json(&record)
        .timeout(Duration::from_secs(30))
        .send()
        .await?
        .error_for_status()?;

    let prediction: Value = response.json().await?;
    info!(
        "Prediction response:\n{}",
        serde_json::to_string_pretty(&prediction)?
    );

    Ok(())
}
