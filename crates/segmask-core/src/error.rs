use std::path::PathBuf;
use thiserror::Error;

pub type SegmaskResult<T> = std::result::Result<T, SegmaskError>;

#[derive(Debug, Error)]
pub enum SegmaskError {
    #[error("input directory does not exist: {}", .0.display())]
    InputDirNotFound(PathBuf),

    #[error("model directory does not exist: {}", .0.display())]
    ModelDirNotFound(PathBuf),

    #[error("no parameter file found at {}", .0.display())]
    ParamFileNotFound(PathBuf),

    #[error("model must be one of: {} (got {name})", .available.join(", "))]
    UnknownModel { name: String, available: Vec<String> },

    #[error("{given} channel names were specified but the configuration expects {expected}")]
    ChannelOverrideMismatch { given: usize, expected: usize },

    #[error("invalid output suffix: {0:?}")]
    InvalidSuffix(String),

    #[error("probability threshold must be within [0, 1]: {0}")]
    InvalidThreshold(f32),

    #[error("cannot derive a case identifier from {}", .0.display())]
    InvalidCase(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no image data (.nii.gz) found in {}", .0.display())]
    NoDataFound(PathBuf),

    #[error("no checkpoints found in {}", .0.display())]
    NoCheckpointsFound(PathBuf),

    #[error(
        "could not determine 'best' checkpoint from filename {}; use 'last' or pass a checkpoint name",
        .0.display()
    )]
    AmbiguousBestCheckpoint(PathBuf),

    #[error("checkpoint {name:?} not found in {}", .dir.display())]
    CheckpointNotFound { name: String, dir: PathBuf },

    #[error("no 'eval' directories found in {}; add them to the manifest or pass them explicitly", .0.display())]
    NoEvalDirectories(PathBuf),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("scoring returned {got} values but {expected} metric names are configured")]
    ScoreLengthMismatch { expected: usize, got: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
