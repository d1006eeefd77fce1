use crate::error::{SegmaskError, SegmaskResult};
use crate::layout::ModelLayout;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Data split a dataset is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetMode {
    Train,
    Val,
    Eval,
}

impl DatasetMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Eval => "eval",
        }
    }
}

impl fmt::Display for DatasetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where evaluation data comes from. Exactly one form per resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvalData {
    /// Study directories a dataset has to be built from.
    Directories { paths: Vec<PathBuf> },
    /// A pre-generated dataset, loaded as-is.
    Cached { path: PathBuf },
}

/// Split name to study directories, as listed in `study_dirs_list.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudyDirManifest {
    splits: BTreeMap<String, Option<Vec<PathBuf>>>,
}

impl StudyDirManifest {
    pub fn load(path: &Path) -> SegmaskResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SegmaskError::Manifest(format!("{}: {}", path.display(), e)))?;
        serde_yaml::from_str(&content)
            .map_err(|e| SegmaskError::Manifest(format!("{}: {}", path.display(), e)))
    }

    /// Directories of one split; empty when the split is absent.
    #[must_use]
    pub fn split(&self, mode: DatasetMode) -> &[PathBuf] {
        self.splits.get(mode.as_str()).and_then(Option::as_deref).unwrap_or_default()
    }
}

/// Resolve evaluation data, first match wins:
/// 1. explicit directories (used verbatim),
/// 2. the cached dataset at `<model_dir>/dataset/eval`,
/// 3. the `eval` split of the study-directory manifest.
///
/// A missing or unreadable manifest is a `Manifest` error; a manifest without
/// `eval` directories is `NoEvalDirectories`.
pub fn resolve_eval_data(explicit: Option<&[PathBuf]>, layout: &ModelLayout) -> SegmaskResult<EvalData> {
    if let Some(dirs) = explicit.filter(|dirs| !dirs.is_empty()) {
        info!("Loading data directories specified with command line argument...");
        return Ok(EvalData::Directories { paths: dirs.to_vec() });
    }

    let cached = layout.cached_split_dir(DatasetMode::Eval.as_str());
    if cached.is_dir() {
        info!("Loading existing evaluation dataset from {}", layout.dataset_dir().display());
        return Ok(EvalData::Cached { path: cached });
    }

    let manifest_path = layout.study_manifest_path();
    let manifest = StudyDirManifest::load(&manifest_path)?;
    let dirs = manifest.split(DatasetMode::Eval);
    if dirs.is_empty() {
        error!(
            "No 'eval' directories found in {}! These may need to be added manually depending on \
             train/val/eval split, or passed explicitly.",
            manifest_path.display()
        );
        return Err(SegmaskError::NoEvalDirectories(manifest_path));
    }
    Ok(EvalData::Directories { paths: dirs.to_vec() })
}
