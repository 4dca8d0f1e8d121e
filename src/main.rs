//! Exploitcast - Main Entry Point
//!
//! `learn` fits and persists a model from an outcome history,
//! `evaluate` cross-validates the same configuration and
//! `predict` scores vulnerabilities with a saved model.

mod api;
mod logic;
pub mod constants;

use std::path::PathBuf;
use anyhow::Result;
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};

use api::commands::{
    self, DatasetOptions, EvaluateRequest, LearnRequest, ModelOptions, PredictRequest,
};
use logic::config::PipelineConfig;
use logic::dataset::BuildOptions;
use logic::model::{ModelKind, TrainingParams, ValidationMethod};
use logic::time::parse_observed;

#[derive(Parser)]
#[command(name = constants::APP_NAME, version = constants::APP_VERSION)]
#[command(about = "Forecast CVE exploitability from historical outcomes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fit a model and save it as <output>.model.json
    Learn {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Cross-validate a model configuration
    Evaluate {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long, default_value_t = 5)]
        n_splits: usize,
        #[arg(long, default_value = "kfold")]
        cross_mode: ValidationMethod,
    },
    /// Score CVE ids with a saved model
    Predict {
        /// Model file written by `learn`
        #[arg(short, long)]
        model: PathBuf,
        /// Observation date (YYYY-MM-DD); today when absent
        #[arg(long, value_parser = parse_date)]
        at: Option<NaiveDateTime>,
        /// Offline CVE records (JSON object keyed by id) instead of the HTTP API
        #[arg(long)]
        source: Option<PathBuf>,
        #[command(flatten)]
        build: BuildArgs,
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Outcome history (CSV with id,date,outcome)
    #[arg(short, long)]
    dataset: PathBuf,
    /// Offline CVE records (JSON object keyed by id) instead of the HTTP API
    #[arg(long)]
    source: Option<PathBuf>,
    /// Regressor: linear, svr or nn (one-hidden-layer network, the default)
    #[arg(long, default_value = "nn")]
    model: ModelKind,
    /// Training epochs (nn only)
    #[arg(short, long, default_value_t = 500)]
    epochs: usize,
    /// Mini-batch size (nn only)
    #[arg(long, default_value_t = 1)]
    batch_size: usize,
    /// Hidden layer width (nn only)
    #[arg(long, default_value_t = 16)]
    hidden_units: usize,
    /// SGD step size (nn only)
    #[arg(long, default_value_t = 0.01)]
    learning_rate: f64,
    /// Minimum number of vulnerabilities a feature must appear in
    #[arg(long, default_value_t = 1)]
    threshold: usize,
    /// Minimum absolute correlation between a feature and the target
    #[arg(long, default_value_t = 0.0)]
    min_correlation: f64,
    /// Number of PCA components (no reduction when absent)
    #[arg(long)]
    n_components: Option<usize>,
    #[arg(long)]
    skip_selection: bool,
    #[command(flatten)]
    build: BuildArgs,
    /// Seeds network initialisation and shuffle splits
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Record parts left out of the feature set
#[derive(Args)]
struct BuildArgs {
    #[arg(long)]
    skip_keywords: bool,
    #[arg(long)]
    skip_capec: bool,
    #[arg(long)]
    skip_cwe: bool,
}

impl From<BuildArgs> for BuildOptions {
    fn from(args: BuildArgs) -> Self {
        BuildOptions {
            skip_keywords: args.skip_keywords,
            skip_capec: args.skip_capec,
            skip_cwe: args.skip_cwe,
            target: None,
        }
    }
}

impl CommonArgs {
    fn split(self) -> (DatasetOptions, ModelOptions) {
        (
            DatasetOptions {
                dataset: self.dataset,
                source: self.source,
                threshold: self.threshold,
                min_correlation: self.min_correlation,
                skip_selection: self.skip_selection,
                build: self.build.into(),
            },
            ModelOptions {
                kind: self.model,
                params: TrainingParams {
                    epochs: self.epochs,
                    batch_size: self.batch_size,
                    hidden_units: self.hidden_units,
                    learning_rate: self.learning_rate,
                    seed: self.seed,
                },
                n_components: self.n_components,
            },
        )
    }
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    parse_observed(raw).ok_or_else(|| format!("unparseable date '{}'", raw))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env();
    log::info!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);

    match cli.command {
        Command::Learn { common, output } => {
            let (data, model) = common.split();
            if model.kind != ModelKind::Neural {
                log::debug!("{} backend ignores the nn-only training flags", model.kind);
            }
            let summary = commands::learn(&LearnRequest { data, model, output }, &config)?;
            log::info!(
                "Model {} written to {} ({} events, {} features)",
                summary.metadata.model_id,
                summary.model_path.display(),
                summary.load.events,
                summary.metadata.feature_count
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Evaluate { common, n_splits, cross_mode } => {
            let (data, model) = common.split();
            let request = EvaluateRequest {
                data,
                model,
                n_splits,
                method: cross_mode,
            };
            let summary = commands::evaluate(&request, &config)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Predict { model, at, source, build, ids } => {
            let request = PredictRequest {
                model,
                ids,
                observed: at,
                source,
                build: build.into(),
            };
            let summary = commands::predict(&request, &config)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
