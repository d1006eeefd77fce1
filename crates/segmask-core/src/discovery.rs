//! Case discovery and per-case input validation.
//!
//! A case is one study directory holding `.nii.gz` volumes. The input root is
//! either a case itself or a container whose children are cases.

use crate::error::{SegmaskError, SegmaskResult};
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Extension shared by every input volume and every produced mask.
pub const IMAGE_EXTENSION: &str = "nii.gz";

/// One study directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Case {
    path: PathBuf,
    id: String,
}

impl Case {
    /// Build a case from a directory path. The identifier is the last segment of
    /// the lexically normalised path, so `a/b/` and `a/b/.` both yield `b`.
    pub fn new(path: impl AsRef<Path>) -> SegmaskResult<Self> {
        let path = normalize(path.as_ref());
        let id = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => std::fs::canonicalize(&path)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .ok_or_else(|| SegmaskError::InvalidCase(path.clone()))?,
        };
        Ok(Self { path, id })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf =
        path.components().filter(|c| !matches!(c, Component::CurDir)).collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

fn glob_paths(dir: &Path, file_pattern: &str) -> SegmaskResult<Vec<PathBuf>> {
    let pattern = format!("{}/{}", Pattern::escape(&dir.to_string_lossy()), file_pattern);
    // wildcards never match a leading dot (`._sub01_t1.nii.gz`, `.trash/`)
    let options = MatchOptions { require_literal_leading_dot: true, ..MatchOptions::new() };
    let paths = glob::glob_with(&pattern, options)
        .map_err(|e| SegmaskError::Config(format!("invalid glob pattern {pattern}: {e}")))?;
    Ok(paths.filter_map(Result::ok).filter(|p| p.is_file()).collect())
}

/// Determine the cases under `root`, sorted and deduplicated.
pub fn discover_cases(root: &Path) -> SegmaskResult<Vec<Case>> {
    if !root.is_dir() {
        return Err(SegmaskError::InputDirNotFound(root.to_path_buf()));
    }

    let image_pattern = format!("*.{IMAGE_EXTENSION}");
    if !glob_paths(root, &image_pattern)?.is_empty() {
        debug!(root = %root.display(), "input root is a single case");
        return Ok(vec![Case::new(root)?]);
    }

    let parents: BTreeSet<PathBuf> = glob_paths(root, &format!("*/{image_pattern}"))?
        .into_iter()
        .filter_map(|file| file.parent().map(Path::to_path_buf))
        .collect();
    if parents.is_empty() {
        return Err(SegmaskError::NoDataFound(root.to_path_buf()));
    }

    debug!(root = %root.display(), cases = parents.len(), "input root contains case directories");
    parents.into_iter().map(Case::new).collect()
}

/// Outcome of checking one case for its required channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputCheck {
    /// Required suffixes with no matching file, in configuration order.
    pub missing: Vec<String>,
}

impl InputCheck {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Check that every channel suffix has at least one `*<suffix>.nii.gz` file in the case.
pub fn check_inputs(case: &Case, channels: &[String]) -> SegmaskResult<InputCheck> {
    let mut missing = Vec::new();
    for suffix in channels {
        let pattern = format!("*{}.{IMAGE_EXTENSION}", Pattern::escape(suffix));
        if glob_paths(case.path(), &pattern)?.is_empty() {
            missing.push(suffix.clone());
        }
    }
    Ok(InputCheck { missing })
}
