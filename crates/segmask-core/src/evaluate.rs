//! Scoring a trained model against held-out data.

use crate::backend::{EvaluationBackend, Runtime, RuntimeGuard};
use crate::checkpoint::{resolve_checkpoint, CheckpointSelector};
use crate::dataset::{resolve_eval_data, DatasetMode, EvalData};
use crate::error::{SegmaskError, SegmaskResult};
use crate::params::ResolvedParams;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct EvaluationRequest {
    pub checkpoint: CheckpointSelector,
    /// Explicit study directories; bypass the dataset cache and the manifest.
    pub directories: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub checkpoint: PathBuf,
    pub data: EvalData,
    pub metrics: Vec<MetricValue>,
    pub evaluated_at: DateTime<Utc>,
}

/// Pair scores with metric names; index 0 is always the loss.
pub fn pair_metrics(names: &[&str], scores: &[f64]) -> SegmaskResult<Vec<MetricValue>> {
    if scores.len() < names.len() {
        return Err(SegmaskError::ScoreLengthMismatch { expected: names.len(), got: scores.len() });
    }
    if scores.len() > names.len() {
        warn!(extra = scores.len() - names.len(), "ignoring unnamed evaluation results");
    }
    Ok(names
        .iter()
        .zip(scores)
        .map(|(name, value)| MetricValue { name: (*name).to_string(), value: *value })
        .collect())
}

/// Resolve checkpoint and data, load weights into a fresh model and score it.
/// Any failure aborts the evaluation.
pub fn run_evaluation<B: EvaluationBackend>(
    backend: &B,
    runtime: &dyn Runtime,
    params: &ResolvedParams,
    request: &EvaluationRequest,
) -> SegmaskResult<EvaluationReport> {
    let layout = params.layout();
    let checkpoint = resolve_checkpoint(&layout.checkpoints_dir(), &request.checkpoint).inspect_err(|e| {
        if matches!(e, SegmaskError::AmbiguousBestCheckpoint(_)) {
            error!("{e}");
        }
    })?;
    info!(checkpoint = %checkpoint.display(), selector = %request.checkpoint, "resolved checkpoint");

    let data = resolve_eval_data(request.directories.as_deref(), &layout)?;
    let params = match &data {
        EvalData::Directories { paths } => params.clone().with_data_directories(paths.clone()),
        EvalData::Cached { .. } => params.clone(),
    }
    .with_checkpoint(checkpoint.clone());

    let _runtime = RuntimeGuard::acquire(runtime);
    let dataset = match &data {
        EvalData::Directories { paths } => backend.dataset_from_directories(&params, paths, DatasetMode::Eval)?,
        EvalData::Cached { path } => backend.load_cached_dataset(path)?,
    };

    info!("Creating the model to resume checkpoint");
    let mut model = backend.build_model(&params)?;
    info!("Loading model weights checkpoint file {}", checkpoint.display());
    backend.load_weights(&mut model, &checkpoint)?;

    info!("Evaluating model...");
    let scores = backend.evaluate(&model, &dataset)?;
    let metrics = pair_metrics(&params.metric_names(), &scores)?;

    info!("Completed evaluation:");
    for metric in &metrics {
        info!("    {} = {:0.4}", metric.name, metric.value);
    }

    Ok(EvaluationReport { checkpoint, data, metrics, evaluated_at: Utc::now() })
}
