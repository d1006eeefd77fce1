//! Shared fixtures: in-memory collaborators and on-disk model/case trees.

#![allow(dead_code)]

use segmask_core::{
    BatchEvent, BatchObserver, CheckpointSelector, DatasetMode, EvalData, EvaluationBackend, Inference,
    Params, PostprocessOptions, Postprocessor, ResolveOptions, ResolvedParams, Runtime, SegmaskError,
    SegmaskResult,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

pub fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
}

/// Model directory whose parameter file uses `model_dir: "same"`.
pub fn write_model(dir: &Path, channels: &[&str]) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let param_file = dir.join("params.json");
    let body = serde_json::json!({
        "data_prefix": channels,
        "model_dir": "same",
        "loss": "dice",
        "metrics": ["accuracy"],
        "dist_strat": "mirrored",
    });
    std::fs::write(&param_file, body.to_string()).unwrap();
    param_file
}

pub fn resolved(param_file: &Path) -> ResolvedParams {
    Params::load(param_file).unwrap().resolve(&ResolveOptions::new(param_file)).unwrap()
}

/// Writes `<out_dir>/<case>_prob.nii.gz`, or fails for the named case.
#[derive(Default)]
pub struct FakeInference {
    pub fail_for: Option<String>,
    pub calls: RefCell<Vec<PathBuf>>,
}

impl Inference for FakeInference {
    fn predict(
        &self,
        _params: &ResolvedParams,
        case_dirs: &[PathBuf],
        out_dir: &Path,
        _mask: Option<&Path>,
        _checkpoint: &CheckpointSelector,
    ) -> SegmaskResult<PathBuf> {
        let case = &case_dirs[0];
        self.calls.borrow_mut().push(case.clone());
        let name = case.file_name().unwrap().to_string_lossy().into_owned();
        if self.fail_for.as_deref() == Some(name.as_str()) {
            return Err(SegmaskError::Backend(format!("out of memory on {name}")));
        }
        let prob = out_dir.join(format!("{name}_prob.nii.gz"));
        std::fs::write(&prob, b"prob").unwrap();
        Ok(prob)
    }
}

/// Copies the probability volume to the output path.
#[derive(Default)]
pub struct CopyPostprocessor;

impl Postprocessor for CopyPostprocessor {
    fn convert(&self, probabilities: &Path, output: &Path, _options: &PostprocessOptions) -> SegmaskResult<PathBuf> {
        std::fs::copy(probabilities, output)?;
        Ok(output.to_path_buf())
    }
}

/// Copies like [`CopyPostprocessor`], except for the named cases: one fails
/// outright, the other reports success without writing anything.
#[derive(Default)]
pub struct SelectivePostprocessor {
    pub fail_for: Option<String>,
    pub no_write_for: Option<String>,
}

impl Postprocessor for SelectivePostprocessor {
    fn convert(&self, probabilities: &Path, output: &Path, options: &PostprocessOptions) -> SegmaskResult<PathBuf> {
        let name = output.file_name().unwrap().to_string_lossy().into_owned();
        if self.fail_for.as_deref().is_some_and(|id| name.starts_with(id)) {
            return Err(SegmaskError::Backend(format!("cannot threshold {name}")));
        }
        if self.no_write_for.as_deref().is_some_and(|id| name.starts_with(id)) {
            return Ok(output.to_path_buf());
        }
        CopyPostprocessor.convert(probabilities, output, options)
    }
}

#[derive(Default)]
pub struct CountingRuntime {
    pub releases: Cell<usize>,
}

impl Runtime for CountingRuntime {
    fn release(&self) {
        self.releases.set(self.releases.get() + 1);
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub events: RefCell<Vec<BatchEvent>>,
}

impl BatchObserver for RecordingObserver {
    fn on_event(&self, event: &BatchEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Scores any dataset with fixed results and records what it was given.
pub struct FakeEvaluator {
    pub scores: Vec<f64>,
    pub fail_scoring: bool,
    pub fail_loading: bool,
    pub evaluations: Cell<usize>,
    pub datasets: RefCell<Vec<EvalData>>,
    pub modes: RefCell<Vec<DatasetMode>>,
}

impl FakeEvaluator {
    pub fn new(scores: Vec<f64>) -> Self {
        Self {
            scores,
            fail_scoring: false,
            fail_loading: false,
            evaluations: Cell::default(),
            datasets: RefCell::default(),
            modes: RefCell::default(),
        }
    }
}

impl EvaluationBackend for FakeEvaluator {
    type Model = Option<PathBuf>;
    type Dataset = EvalData;

    fn build_model(&self, params: &ResolvedParams) -> SegmaskResult<Self::Model> {
        assert!(!params.execution.distributed);
        Ok(None)
    }

    fn load_weights(&self, model: &mut Self::Model, checkpoint: &Path) -> SegmaskResult<()> {
        if self.fail_loading {
            return Err(SegmaskError::Backend(format!("corrupt weights in {}", checkpoint.display())));
        }
        *model = Some(checkpoint.to_path_buf());
        Ok(())
    }

    fn dataset_from_directories(
        &self,
        params: &ResolvedParams,
        dirs: &[PathBuf],
        mode: DatasetMode,
    ) -> SegmaskResult<Self::Dataset> {
        assert_eq!(params.data_directories.as_deref(), Some(dirs));
        self.modes.borrow_mut().push(mode);
        let data = EvalData::Directories { paths: dirs.to_vec() };
        self.datasets.borrow_mut().push(data.clone());
        Ok(data)
    }

    fn load_cached_dataset(&self, path: &Path) -> SegmaskResult<Self::Dataset> {
        let data = EvalData::Cached { path: path.to_path_buf() };
        self.datasets.borrow_mut().push(data.clone());
        Ok(data)
    }

    fn evaluate(&self, model: &Self::Model, _dataset: &Self::Dataset) -> SegmaskResult<Vec<f64>> {
        assert!(model.is_some(), "weights must be loaded before scoring");
        self.evaluations.set(self.evaluations.get() + 1);
        if self.fail_scoring {
            return Err(SegmaskError::Backend("scoring crashed".to_string()));
        }
        Ok(self.scores.clone())
    }
}
