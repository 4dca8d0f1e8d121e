//! Commands - `learn`, `evaluate` and `predict`

use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MODEL_EXTENSION;
use crate::logic::config::PipelineConfig;
use crate::logic::dataset::{
    fetch_vulnerability, BuildOptions, HistoryLoader, LoadReport, VulnerabilityEvent,
};
use crate::logic::external_intel::{CveSearchClient, CveSource, InMemorySource};
use crate::logic::features::{
    build_schema, FeatureSchema, FeatureSelector, SchemaInfo, SchemaOptions,
};
use crate::logic::keywords::KeywordExtractor;
use crate::logic::model::{
    Estimator, ExploitabilityModel, ModelKind, ModelMetadata, PerformanceValidator,
    TrainingParams, ValidationMethod, ValidationReport,
};

// ============================================================================
// REQUESTS
// ============================================================================

/// Where the history comes from and how its schema is derived
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    pub dataset: PathBuf,
    /// Offline records (JSON object keyed by CVE id) instead of the HTTP API
    pub source: Option<PathBuf>,
    /// Minimum number of vulnerabilities a feature must appear in
    pub threshold: usize,
    pub min_correlation: f64,
    pub skip_selection: bool,
    /// Which record parts become features
    pub build: BuildOptions,
}

#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub kind: ModelKind,
    pub params: TrainingParams,
    pub n_components: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct LearnRequest {
    pub data: DatasetOptions,
    pub model: ModelOptions,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    pub data: DatasetOptions,
    pub model: ModelOptions,
    pub n_splits: usize,
    pub method: ValidationMethod,
}

#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub model: PathBuf,
    pub ids: Vec<String>,
    /// Observation time; now when absent
    pub observed: Option<NaiveDateTime>,
    pub source: Option<PathBuf>,
    /// Must match the options the model was trained with
    pub build: BuildOptions,
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnSummary {
    pub model_path: PathBuf,
    pub metadata: ModelMetadata,
    pub schema: SchemaInfo,
    pub load: LoadReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateSummary {
    pub report: ValidationReport,
    pub load: LoadReport,
    pub schema: SchemaInfo,
}

/// Outcome for one requested id; lookup problems are reported, not fatal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub exploitability: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictSummary {
    pub model_id: Uuid,
    pub observed: NaiveDateTime,
    pub predictions: Vec<Prediction>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Fit a model on the dataset and persist it next to `output`
pub fn learn(request: &LearnRequest, config: &PipelineConfig) -> Result<LearnSummary> {
    let (events, load) = load_dataset(&request.data, config)?;
    let schema = derive_schema(&request.data, &events, config);

    let mut model = configure_model(schema, &request.model, config);
    model
        .learn_by_data(&events)
        .context("Failed to fit model")?;

    let model_path = model_path(&request.output);
    let metadata = model
        .save(&model_path)
        .with_context(|| format!("Failed to save model to {}", model_path.display()))?;

    Ok(LearnSummary {
        model_path,
        metadata,
        schema: model.schema().info(),
        load,
    })
}

/// Cross-validate a freshly configured model on the dataset
pub fn evaluate(request: &EvaluateRequest, config: &PipelineConfig) -> Result<EvaluateSummary> {
    let (events, load) = load_dataset(&request.data, config)?;
    let schema = derive_schema(&request.data, &events, config);
    let schema_info = schema.info();

    let template = configure_model(schema, &request.model, config);
    let report = PerformanceValidator::new(request.method, request.n_splits)
        .with_seed(request.model.params.seed)
        .evaluate_dataset(&template, &events)
        .context("Cross-validation failed")?;

    Ok(EvaluateSummary {
        report,
        load,
        schema: schema_info,
    })
}

/// Score vulnerabilities with a saved model
pub fn predict(request: &PredictRequest, config: &PipelineConfig) -> Result<PredictSummary> {
    let model = ExploitabilityModel::load(&request.model)
        .with_context(|| format!("Failed to load model from {}", request.model.display()))?;
    let extractor = KeywordExtractor::from_config(config).context("Failed to load keyword tables")?;
    let source = open_source(request.source.as_deref(), config)?;
    let observed = request.observed.unwrap_or_else(|| Utc::now().naive_utc());

    let mut predictions = Vec::with_capacity(request.ids.len());
    for raw in &request.ids {
        let id = raw.trim().to_uppercase();
        let scored = fetch_vulnerability(&id, source.as_ref(), &extractor, &request.build)
            .and_then(|vuln| model.predict_vulnerability(&vuln, observed));

        let prediction = match scored {
            Ok(value) => Prediction { id, exploitability: Some(value), error: None },
            Err(e) if e.is_recoverable() => {
                log::warn!("No prediction for {}: {}", id, e);
                Prediction { id, exploitability: None, error: Some(e.to_string()) }
            }
            Err(e) => return Err(e).with_context(|| format!("Prediction failed for {}", id)),
        };
        predictions.push(prediction);
    }

    Ok(PredictSummary {
        model_id: model.id(),
        observed,
        predictions,
    })
}

// ============================================================================
// HELPERS
// ============================================================================

fn load_dataset(
    options: &DatasetOptions,
    config: &PipelineConfig,
) -> Result<(Vec<VulnerabilityEvent>, LoadReport)> {
    let extractor = KeywordExtractor::from_config(config).context("Failed to load keyword tables")?;
    let source = open_source(options.source.as_deref(), config)?;

    let loader = HistoryLoader::new(&options.dataset, source.as_ref(), &extractor)
        .with_config(config.clone())
        .with_options(options.build.clone());
    let events = loader
        .load()
        .with_context(|| format!("Failed to load history from {}", options.dataset.display()))?
        .to_vec();
    let report = loader.report().cloned().unwrap_or_default();

    Ok((events, report))
}

/// Offline records when a file is given, the HTTP API otherwise
fn open_source(path: Option<&Path>, config: &PipelineConfig) -> Result<Box<dyn CveSource>> {
    Ok(match path {
        Some(path) => Box::new(
            InMemorySource::from_json_file(path)
                .with_context(|| format!("Failed to read records from {}", path.display()))?,
        ),
        None => Box::new(CveSearchClient::from_config(config)),
    })
}

fn derive_schema(
    options: &DatasetOptions,
    events: &[VulnerabilityEvent],
    config: &PipelineConfig,
) -> FeatureSchema {
    if options.skip_selection {
        return build_schema(events, SchemaOptions::default());
    }
    FeatureSelector::new(options.threshold, options.min_correlation)
        .select(events, config.target_window())
}

fn configure_model(
    schema: FeatureSchema,
    options: &ModelOptions,
    config: &PipelineConfig,
) -> ExploitabilityModel {
    ExploitabilityModel::new(schema, Estimator::new(options.kind, &options.params))
        .with_components(options.n_components)
        .with_target_window(config.target_window())
}

/// `name` -> `name.model.json` unless already suffixed
fn model_path(output: &Path) -> PathBuf {
    let suffix = format!(".{}", MODEL_EXTENSION);
    if output.to_string_lossy().ends_with(&suffix) {
        return output.to_path_buf();
    }
    let mut name = output.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
