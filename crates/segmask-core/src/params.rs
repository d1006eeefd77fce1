//! Model parameter files and their per-run resolution.
//!
//! A [`Params`] value is exactly what the JSON parameter file says. Everything
//! derived for a run (model directory, channel overrides, forced execution
//! strategy, chosen checkpoint, evaluation directories) lives in a separate
//! [`ResolvedParams`] value produced by [`Params::resolve`].

use crate::error::{SegmaskError, SegmaskResult};
use crate::layout::ModelLayout;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

/// `model_dir` value meaning "the directory holding the parameter file".
pub const SAME_MODEL_DIR: &str = "same";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Required input channel suffixes, in network input order.
    pub data_prefix: Vec<String>,
    pub model_dir: String,
    #[serde(default = "default_dist_strat")]
    pub dist_strat: String,
    #[serde(default)]
    pub mixed_precision: bool,
    #[serde(default = "default_loss")]
    pub loss: String,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub train_dims: Option<Vec<u32>>,
    #[serde(default)]
    pub infer_dims: Option<Vec<u32>>,
    #[serde(default)]
    pub random_state: Option<u64>,
    /// Keys only the external collaborators understand.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_dist_strat() -> String {
    "none".to_string()
}

fn default_loss() -> String {
    "loss".to_string()
}

impl Params {
    pub fn load(path: &Path) -> SegmaskResult<Self> {
        if !path.is_file() {
            return Err(SegmaskError::ParamFileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Derive the run configuration. Never touches `self`.
    pub fn resolve(&self, options: &ResolveOptions) -> SegmaskResult<ResolvedParams> {
        let channels = match &options.channel_overrides {
            Some(names) => {
                if names.len() != self.data_prefix.len() {
                    return Err(SegmaskError::ChannelOverrideMismatch {
                        given: names.len(),
                        expected: self.data_prefix.len(),
                    });
                }
                info!("Using user specified suffixes for data as follows:");
                for (old, new) in self.data_prefix.iter().zip(names) {
                    info!("{old} --> {new}");
                }
                names.clone()
            }
            None => self.data_prefix.clone(),
        };
        if channels.is_empty() {
            return Err(SegmaskError::Config(
                "data_prefix must list at least one input channel".to_string(),
            ));
        }

        let model_dir = if self.model_dir == SAME_MODEL_DIR {
            match options.param_file.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            }
        } else {
            PathBuf::from(&self.model_dir)
        };
        if !model_dir.is_dir() {
            return Err(SegmaskError::ModelDirNotFound(model_dir));
        }

        Ok(ResolvedParams {
            param_file: options.param_file.clone(),
            model_dir,
            channels,
            execution: ExecutionStrategy::single_device(),
            loss: self.loss.clone(),
            metrics: self.metrics.clone(),
            input_dims: self.infer_dims.clone().or_else(|| self.train_dims.clone()),
            random_state: self.random_state,
            checkpoint: None,
            data_directories: None,
            extra: self.extra.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub param_file: PathBuf,
    /// Replacement channel suffixes, one per entry of `data_prefix`.
    pub channel_overrides: Option<Vec<String>>,
}

impl ResolveOptions {
    #[must_use]
    pub fn new(param_file: impl Into<PathBuf>) -> Self {
        Self { param_file: param_file.into(), channel_overrides: None }
    }

    #[must_use]
    pub fn with_channel_overrides(mut self, names: Vec<String>) -> Self {
        self.channel_overrides = Some(names);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionStrategy {
    pub distributed: bool,
    pub mixed_precision: bool,
}

impl ExecutionStrategy {
    /// Inference and evaluation always run undistributed at full precision.
    #[must_use]
    pub fn single_device() -> Self {
        Self { distributed: false, mixed_precision: false }
    }
}

/// Configuration of one run, after resolution.
#[derive(Debug, Clone)]
pub struct ResolvedParams {
    pub param_file: PathBuf,
    pub model_dir: PathBuf,
    pub channels: Vec<String>,
    pub execution: ExecutionStrategy,
    pub loss: String,
    pub metrics: Vec<String>,
    /// Network input size; inference dims take precedence over training dims.
    pub input_dims: Option<Vec<u32>>,
    pub random_state: Option<u64>,
    pub checkpoint: Option<PathBuf>,
    pub data_directories: Option<Vec<PathBuf>>,
    extra: Map<String, Value>,
}

impl ResolvedParams {
    #[must_use]
    pub fn layout(&self) -> ModelLayout {
        ModelLayout::new(&self.model_dir)
    }

    #[must_use]
    pub fn with_checkpoint(self, checkpoint: PathBuf) -> Self {
        Self { checkpoint: Some(checkpoint), ..self }
    }

    #[must_use]
    pub fn with_data_directories(self, dirs: Vec<PathBuf>) -> Self {
        Self { data_directories: Some(dirs), ..self }
    }

    /// Metric names in scoring order: the loss first, then the configured metrics.
    #[must_use]
    pub fn metric_names(&self) -> Vec<&str> {
        std::iter::once(self.loss.as_str())
            .chain(self.metrics.iter().map(String::as_str))
            .collect()
    }

    /// Full configuration as handed to external collaborators.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert("data_prefix".to_string(), Value::from(self.channels.clone()));
        map.insert("model_dir".to_string(), path_value(&self.model_dir));
        map.insert("dist_strat".to_string(), Value::from("none"));
        map.insert("mixed_precision".to_string(), Value::Bool(self.execution.mixed_precision));
        map.insert("loss".to_string(), Value::from(self.loss.clone()));
        map.insert("metrics".to_string(), Value::from(self.metrics.clone()));
        if let Some(dims) = &self.input_dims {
            map.insert("train_dims".to_string(), Value::from(dims.clone()));
            map.insert("infer_dims".to_string(), Value::from(dims.clone()));
        }
        if let Some(seed) = self.random_state {
            map.insert("random_state".to_string(), Value::from(seed));
        }
        if let Some(checkpoint) = &self.checkpoint {
            map.insert("checkpoint".to_string(), path_value(checkpoint));
        }
        if let Some(dirs) = &self.data_directories {
            map.insert(
                "data_directories".to_string(),
                Value::Array(dirs.iter().map(|d| path_value(d)).collect()),
            );
        }
        Value::Object(map)
    }
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}
