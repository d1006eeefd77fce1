//! Segmask Core
//!
//! Batch orchestration around a trained CNN segmentation model:
//! - Discovering cases and checking their input channels
//! - Resolving parameter files, checkpoints and evaluation data
//! - Running mask generation over many cases (`MaskRunner`)
//! - Scoring a checkpoint against held-out data (`run_evaluation`)
//!
//! Inference, post-processing and scoring are external collaborators behind
//! the traits in [`backend`]; [`process::ProcessBackend`] drives them as
//! configured commands.

pub mod backend;
pub mod batch;
pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod discovery;
pub mod error;
pub mod evaluate;
pub mod layout;
pub mod params;
pub mod process;
pub mod progress;
pub mod registry;

pub use backend::{EvaluationBackend, Inference, PostprocessOptions, Postprocessor, Runtime, RuntimeGuard};
pub use batch::{
    normalize_suffix, BatchReport, CaseOutcome, CaseRecord, MaskOptions, MaskRunner, SkipReason, DEFAULT_SUFFIX,
    DEFAULT_THRESHOLD,
};
pub use checkpoint::{resolve_checkpoint, CheckpointArtifact, CheckpointSelector, CheckpointSet};
pub use config::{BackendCommands, SegmaskConfig};
pub use dataset::{resolve_eval_data, DatasetMode, EvalData, StudyDirManifest};
pub use discovery::{check_inputs, discover_cases, Case, InputCheck};
pub use error::{SegmaskError, SegmaskResult};
pub use evaluate::{pair_metrics, run_evaluation, EvaluationReport, EvaluationRequest, MetricValue};
pub use layout::ModelLayout;
pub use params::{ExecutionStrategy, Params, ResolveOptions, ResolvedParams};
pub use process::{ProcessBackend, ProcessModel};
pub use progress::{BatchEvent, BatchObserver, LogObserver};
pub use registry::{discover_trained_models, resolve_trained_model, TrainedModelEntry};
