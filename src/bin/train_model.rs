//! Trains the stock direction classifier and writes the model artifact
//! together with its feature manifest.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use stock_predict::application::ml::training::{ForestParams, TrainingDataset, train};
use stock_predict::config::{DEFAULT_MANIFEST_PATH, DEFAULT_MODEL_PATH};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the financial indicators CSV
    #[arg(long, default_value = "data/us_stocks_financial_indicators.csv")]
    input: PathBuf,

    /// Name of the target column
    #[arg(long, default_value = "class")]
    target: String,

    /// Path to output model file
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    output: PathBuf,

    /// Path to output feature manifest
    #[arg(long, default_value = DEFAULT_MANIFEST_PATH)]
    manifest: PathBuf,

    /// Number of trees in the random forest
    #[arg(long, default_value_t = 100)]
    n_trees: u16,

    /// Maximum depth of trees
    #[arg(long, default_value_t = 3)]
    max_depth: u16,

    /// Minimum samples required to split an internal node
    #[arg(long, default_value_t = 2)]
    min_split: usize,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    holdout: f64,

    /// Seed for the train/holdout shuffle
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Declare integral columns as int64 instead of float64
    #[arg(long)]
    integer_columns: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stock_predict=info".parse()?)
                .add_directive("train_model=info".parse()?),
        )
        .init();

    let args = Args::parse();

    info!("Loading dataset from {:?}", args.input);
    let file = File::open(&args.input)
        .with_context(|| format!("Training data not found at {:?}", args.input))?;
    let dataset = TrainingDataset::from_csv(BufReader::new(file), &args.target)?;

    let (decrease, increase) = dataset.class_counts();
    info!(
        "Dataset loaded: {} rows, {} features (decrease: {}, increase: {})",
        dataset.rows.len(),
        dataset.feature_names.len(),
        decrease,
        increase
    );

    let params = ForestParams {
        n_trees: args.n_trees,
        max_depth: args.max_depth,
        min_samples_split: args.min_split,
        holdout_fraction: args.holdout,
        seed: args.seed,
    };
    let report = train(&dataset, &params)?;

    match report.holdout_accuracy {
        Some(acc) => info!(
            "Holdout accuracy (n={}): {:.2}%",
            report.holdout_size,
            acc * 100.0
        ),
        None => info!("No holdout rows; skipped evaluation"),
    }

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {:?}", args.output))?;
    serde_json::to_writer(BufWriter::new(file), &report.pipeline)?;
    info!(
        "Model (trained on {} samples) saved to {:?}",
        report.train_size, args.output
    );

    let manifest = if args.integer_columns {
        dataset.manifest_with_integer_columns()
    } else {
        report.manifest
    };

    // Written together so the server reads the same column order
    manifest.save(&args.manifest)?;
    info!(
        "Feature manifest ({} columns) saved to {:?}",
        manifest.columns.len(),
        args.manifest
    );

    Ok(())
}
