//! Tool configuration: where trained models live and which commands implement
//! the external collaborators.

use crate::error::{SegmaskError, SegmaskResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Names the configuration file that overrides both global and local files.
pub const CONFIG_ENV: &str = "SEGMASK_CONFIG";
/// Overrides `models_dir` from any configuration file.
pub const MODELS_DIR_ENV: &str = "SEGMASK_MODELS_DIR";

/// Command lines (program followed by fixed arguments) of the collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCommands {
    #[serde(default)]
    pub predict: Vec<String>,
    #[serde(default)]
    pub postprocess: Vec<String>,
    #[serde(default)]
    pub evaluate: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmaskConfig {
    /// Root of `<name>/<name>.json` trained model configurations.
    #[serde(default)]
    pub models_dir: Option<PathBuf>,

    #[serde(default)]
    pub backend: BackendCommands,
}

impl SegmaskConfig {
    pub fn load_from_file(path: &Path) -> SegmaskResult<Self> {
        if !path.is_file() {
            return Err(SegmaskError::Config(format!("configuration file not found: {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| SegmaskError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".segmask")
            .join("config.toml")
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".segmaskrc")
    }

    /// Load and merge, later sources overriding earlier ones:
    /// 1. global config (`~/.segmask/config.toml`)
    /// 2. local config (`./.segmaskrc`)
    /// 3. the file named by `SEGMASK_CONFIG`, which must exist when set
    pub fn discover_and_load() -> SegmaskResult<Self> {
        let mut config = Self::default();

        for path in [Self::default_global_path(), Self::default_local_path()] {
            if path.is_file() {
                config.merge(&Self::load_from_file(&path)?);
            }
        }

        if let Ok(explicit) = std::env::var(CONFIG_ENV) {
            config.merge(&Self::load_from_file(Path::new(&explicit))?);
        }

        Ok(config)
    }

    /// Values set in `other` replace the ones in `self`.
    pub fn merge(&mut self, other: &Self) {
        if let Some(ref dir) = other.models_dir {
            self.models_dir = Some(dir.clone());
        }
        if !other.backend.predict.is_empty() {
            self.backend.predict = other.backend.predict.clone();
        }
        if !other.backend.postprocess.is_empty() {
            self.backend.postprocess = other.backend.postprocess.clone();
        }
        if !other.backend.evaluate.is_empty() {
            self.backend.evaluate = other.backend.evaluate.clone();
        }
    }

    /// Models root: `SEGMASK_MODELS_DIR`, then `models_dir`, then
    /// `trained_models/` next to the executable.
    pub fn models_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(MODELS_DIR_ENV) {
            return PathBuf::from(dir);
        }
        if let Some(dir) = &self.models_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trained_models")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
models_dir = "/opt/models"

[backend]
predict = ["python", "predict.py"]
postprocess = ["python", "prob2seg.py"]
"#,
        )
        .unwrap();

        let config = SegmaskConfig::load_from_file(&path).unwrap();
        assert_eq!(config.models_dir, Some(PathBuf::from("/opt/models")));
        assert_eq!(config.backend.predict, vec!["python", "predict.py"]);
        assert!(config.backend.evaluate.is_empty());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "models_dir = [").unwrap();
        assert!(matches!(SegmaskConfig::load_from_file(&path), Err(SegmaskError::Config(_))));
    }

    #[test]
    fn test_merge() {
        let mut base = SegmaskConfig {
            models_dir: Some(PathBuf::from("/a")),
            backend: BackendCommands { predict: vec!["p".to_string()], ..Default::default() },
        };
        let local = SegmaskConfig {
            models_dir: None,
            backend: BackendCommands { evaluate: vec!["e".to_string()], ..Default::default() },
        };

        base.merge(&local);
        assert_eq!(base.models_dir, Some(PathBuf::from("/a")));
        assert_eq!(base.backend.predict, vec!["p"]);
        assert_eq!(base.backend.evaluate, vec!["e"]);
    }
}
