use crate::error::SegmaskResult;
use std::path::{Path, PathBuf};

/// Extension of checkpoint artifacts under `checkpoints/`.
pub const CHECKPOINT_EXTENSION: &str = "hdf5";

/// Filesystem layout of a trained model directory.
///
/// ```text
/// <model_dir>/
///   checkpoints/*.hdf5
///   dataset/{train,val,eval}/
///   evaluation/eval.log
///   study_dirs_list.yml
/// ```
#[derive(Debug, Clone)]
pub struct ModelLayout {
    root: PathBuf,
}

impl ModelLayout {
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self { root: model_dir.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn checkpoints_dir(&self) -> PathBuf {
        self.root.join("checkpoints")
    }

    #[must_use]
    pub fn dataset_dir(&self) -> PathBuf {
        self.root.join("dataset")
    }

    /// Cache directory of a pre-generated dataset for one split.
    #[must_use]
    pub fn cached_split_dir(&self, split: &str) -> PathBuf {
        self.dataset_dir().join(split)
    }

    #[must_use]
    pub fn evaluation_dir(&self) -> PathBuf {
        self.root.join("evaluation")
    }

    #[must_use]
    pub fn eval_log_path(&self) -> PathBuf {
        self.evaluation_dir().join("eval.log")
    }

    #[must_use]
    pub fn study_manifest_path(&self) -> PathBuf {
        self.root.join("study_dirs_list.yml")
    }

    pub fn ensure_evaluation_dir(&self) -> SegmaskResult<PathBuf> {
        let dir = self.evaluation_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
