//! Seams to the external collaborators: inference, post-processing, model
//! scoring, dataset construction and the accelerator runtime.
//!
//! All calls are blocking and run to completion. Implementations take `&self`
//! so one value can serve several roles at once.

use crate::checkpoint::CheckpointSelector;
use crate::dataset::DatasetMode;
use crate::error::SegmaskResult;
use crate::params::ResolvedParams;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces a probability volume for a set of case directories.
pub trait Inference {
    fn predict(
        &self,
        params: &ResolvedParams,
        case_dirs: &[PathBuf],
        out_dir: &Path,
        mask: Option<&Path>,
        checkpoint: &CheckpointSelector,
    ) -> SegmaskResult<PathBuf>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessOptions {
    pub threshold: f32,
    /// Apply morphological cleanup; `false` keeps raw probabilities.
    pub clean: bool,
}

/// Converts a probability volume into the final output file.
pub trait Postprocessor {
    /// Returns the path that was written. The file only exists once the
    /// conversion completed.
    fn convert(&self, probabilities: &Path, output: &Path, options: &PostprocessOptions) -> SegmaskResult<PathBuf>;
}

/// Model construction, weight loading, dataset construction and scoring.
pub trait EvaluationBackend {
    type Model;
    type Dataset;

    fn build_model(&self, params: &ResolvedParams) -> SegmaskResult<Self::Model>;

    fn load_weights(&self, model: &mut Self::Model, checkpoint: &Path) -> SegmaskResult<()>;

    fn dataset_from_directories(
        &self,
        params: &ResolvedParams,
        dirs: &[PathBuf],
        mode: DatasetMode,
    ) -> SegmaskResult<Self::Dataset>;

    fn load_cached_dataset(&self, path: &Path) -> SegmaskResult<Self::Dataset>;

    /// Ordered results: the loss first, then each configured metric.
    fn evaluate(&self, model: &Self::Model, dataset: &Self::Dataset) -> SegmaskResult<Vec<f64>>;
}

/// Process-wide accelerator/runtime context.
pub trait Runtime {
    fn release(&self);
}

/// Scoped hold on a [`Runtime`]; releases it exactly once when dropped,
/// including on early returns and unwinding.
pub struct RuntimeGuard<'a> {
    runtime: &'a dyn Runtime,
}

impl<'a> RuntimeGuard<'a> {
    pub fn acquire(runtime: &'a dyn Runtime) -> Self {
        debug!("runtime acquired");
        Self { runtime }
    }
}

impl Drop for RuntimeGuard<'_> {
    fn drop(&mut self) {
        self.runtime.release();
        debug!("runtime released");
    }
}
