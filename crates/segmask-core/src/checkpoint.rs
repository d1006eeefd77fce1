//! Checkpoint selection.
//!
//! Checkpoints are `*.hdf5` files under `<model_dir>/checkpoints`. Trainers
//! encode the validation loss as the last `_`-separated segment of the file
//! stem (`epoch_012_0.1234.hdf5`); that value is parsed once, when the
//! directory is scanned.

use crate::error::{SegmaskError, SegmaskResult};
use crate::layout::CHECKPOINT_EXTENSION;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

/// How to pick a checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CheckpointSelector {
    /// Most recently modified artifact.
    #[default]
    Last,
    /// Artifact with the lowest encoded loss.
    Best,
    /// Artifact whose stem equals the name.
    Named(String),
}

impl FromStr for CheckpointSelector {
    type Err = SegmaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(SegmaskError::Config("checkpoint selector must not be empty".to_string())),
            "last" => Ok(Self::Last),
            "best" => Ok(Self::Best),
            name => {
                let name = name
                    .strip_suffix(&format!(".{CHECKPOINT_EXTENSION}"))
                    .unwrap_or(name);
                Ok(Self::Named(name.to_string()))
            }
        }
    }
}

impl fmt::Display for CheckpointSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Last => f.write_str("last"),
            Self::Best => f.write_str("best"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// One checkpoint file.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointArtifact {
    pub path: PathBuf,
    pub stem: String,
    pub modified: SystemTime,
    /// Loss encoded in the file name, if the trailing segment is numeric.
    pub loss: Option<f64>,
}

impl CheckpointArtifact {
    fn from_path(path: PathBuf, modified: SystemTime) -> Self {
        let stem = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .map(|n| {
                n.strip_suffix(&format!(".{CHECKPOINT_EXTENSION}"))
                    .map(str::to_string)
                    .unwrap_or(n)
            })
            .unwrap_or_default();
        let loss = parse_encoded_loss(&stem);
        Self { path, stem, modified, loss }
    }
}

/// Parse the segment after the final `_` (or the whole stem when there is none).
fn parse_encoded_loss(stem: &str) -> Option<f64> {
    let segment = stem.rsplit('_').next()?;
    segment.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// All checkpoint artifacts of one directory.
#[derive(Debug, Clone)]
pub struct CheckpointSet {
    dir: PathBuf,
    artifacts: Vec<CheckpointArtifact>,
}

impl CheckpointSet {
    pub fn scan(dir: &Path) -> SegmaskResult<Self> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SegmaskError::NoCheckpointsFound(dir.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CHECKPOINT_EXTENSION) {
                continue;
            }
            let metadata = std::fs::metadata(&path)?;
            if !metadata.is_file() {
                continue;
            }
            artifacts.push(CheckpointArtifact::from_path(path, metadata.modified()?));
        }

        Self::from_artifacts(dir.to_path_buf(), artifacts)
    }

    pub fn from_artifacts(dir: PathBuf, mut artifacts: Vec<CheckpointArtifact>) -> SegmaskResult<Self> {
        if artifacts.is_empty() {
            return Err(SegmaskError::NoCheckpointsFound(dir));
        }
        artifacts.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self { dir, artifacts })
    }

    /// Pick one artifact. Ties on equal timestamps resolve to the
    /// lexicographically largest path; ties on equal loss to the smallest.
    pub fn select(&self, selector: &CheckpointSelector) -> SegmaskResult<&CheckpointArtifact> {
        match selector {
            CheckpointSelector::Last => self
                .artifacts
                .iter()
                .max_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)))
                .ok_or_else(|| SegmaskError::NoCheckpointsFound(self.dir.clone())),
            CheckpointSelector::Best => {
                let mut best: Option<(&CheckpointArtifact, f64)> = None;
                for artifact in &self.artifacts {
                    let loss = artifact
                        .loss
                        .ok_or_else(|| SegmaskError::AmbiguousBestCheckpoint(artifact.path.clone()))?;
                    let better = match best {
                        None => true,
                        Some((current, current_loss)) => match loss.total_cmp(&current_loss) {
                            Ordering::Less => true,
                            Ordering::Equal => artifact.path < current.path,
                            Ordering::Greater => false,
                        },
                    };
                    if better {
                        best = Some((artifact, loss));
                    }
                }
                best.map(|(artifact, _)| artifact)
                    .ok_or_else(|| SegmaskError::NoCheckpointsFound(self.dir.clone()))
            }
            CheckpointSelector::Named(name) => self
                .artifacts
                .iter()
                .find(|a| &a.stem == name)
                .ok_or_else(|| SegmaskError::CheckpointNotFound {
                    name: name.clone(),
                    dir: self.dir.clone(),
                }),
        }
    }
}

/// Scan `dir` and return the path of the selected checkpoint.
pub fn resolve_checkpoint(dir: &Path, selector: &CheckpointSelector) -> SegmaskResult<PathBuf> {
    let set = CheckpointSet::scan(dir)?;
    Ok(set.select(selector)?.path.clone())
}
