use crate::error::{SegmaskError, SegmaskResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A trained model configuration shipped under the models root.
///
/// Layout: `<models_dir>/<name>/<name>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainedModelEntry {
    /// Name used on the command line (e.g. `t1-t1c-t2-flair`).
    pub name: String,
    pub param_file: PathBuf,
}

fn param_file_for(models_dir: &Path, name: &str) -> PathBuf {
    models_dir.join(name).join(format!("{name}.json"))
}

/// Discover trained models, sorted by name. A missing root yields no models.
pub fn discover_trained_models(models_dir: &Path) -> SegmaskResult<Vec<TrainedModelEntry>> {
    let mut out = Vec::new();

    let dir = match std::fs::read_dir(models_dir) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e.into()),
    };

    for entry in dir {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let param_file = param_file_for(models_dir, &name);
        if !param_file.is_file() {
            continue;
        }
        out.push(TrainedModelEntry { name, param_file });
    }

    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

/// Resolve a model name into its parameter file.
pub fn resolve_trained_model(models_dir: &Path, name: &str) -> SegmaskResult<PathBuf> {
    let models = discover_trained_models(models_dir)?;
    models
        .iter()
        .find(|m| m.name == name)
        .map(|m| m.param_file.clone())
        .ok_or_else(|| SegmaskError::UnknownModel {
            name: name.to_string(),
            available: models.iter().map(|m| m.name.clone()).collect(),
        })
}
