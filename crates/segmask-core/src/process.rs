//! Collaborators implemented as external commands.
//!
//! Each call spawns the configured command line with the run configuration
//! written to a temporary JSON file:
//!
//! ```text
//! predict      --params P --out-dir D --checkpoint SEL [--mask M] --case DIR...
//! postprocess  --prob P --output O --threshold T [--clean]
//! evaluate     --params P --checkpoint C (--data-dir D... | --dataset DIR)
//! ```
//!
//! `predict` prints the probability volume path and `evaluate` a JSON array of
//! numbers, each as the last non-empty line on stdout.

use crate::backend::{EvaluationBackend, Inference, PostprocessOptions, Postprocessor, Runtime};
use crate::checkpoint::CheckpointSelector;
use crate::config::BackendCommands;
use crate::dataset::{DatasetMode, EvalData};
use crate::error::{SegmaskError, SegmaskResult};
use crate::params::ResolvedParams;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ProcessBackend {
    commands: BackendCommands,
    force_cpu: bool,
}

/// Model handle of the process backend: the configuration file the
/// evaluate command reads, plus the loaded checkpoint.
#[derive(Debug)]
pub struct ProcessModel {
    params_file: NamedTempFile,
    checkpoint: Option<PathBuf>,
}

impl ProcessBackend {
    #[must_use]
    pub fn new(commands: BackendCommands) -> Self {
        Self { commands, force_cpu: false }
    }

    /// Hide every GPU from spawned commands.
    #[must_use]
    pub fn with_force_cpu(mut self, force_cpu: bool) -> Self {
        self.force_cpu = force_cpu;
        self
    }

    fn command(&self, role: &str, argv: &[String]) -> SegmaskResult<Command> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SegmaskError::Backend(format!("no {role} command configured")))?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        if self.force_cpu {
            cmd.env("CUDA_VISIBLE_DEVICES", "-1");
        }
        Ok(cmd)
    }

    fn run(role: &str, mut cmd: Command) -> SegmaskResult<String> {
        debug!(role, command = ?cmd, "spawning collaborator");
        let output = cmd
            .output()
            .map_err(|e| SegmaskError::Backend(format!("failed to run {role} command: {e}")))?;
        if !output.status.success() {
            return Err(SegmaskError::Backend(format!(
                "{role} command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn write_params(params: &ResolvedParams) -> SegmaskResult<NamedTempFile> {
        let mut file = tempfile::Builder::new().prefix("segmask-params-").suffix(".json").tempfile()?;
        serde_json::to_writer_pretty(&mut file, &params.to_json())?;
        file.flush()?;
        Ok(file)
    }
}

fn last_line(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).rev().find(|line| !line.is_empty())
}

impl Inference for ProcessBackend {
    fn predict(
        &self,
        params: &ResolvedParams,
        case_dirs: &[PathBuf],
        out_dir: &Path,
        mask: Option<&Path>,
        checkpoint: &CheckpointSelector,
    ) -> SegmaskResult<PathBuf> {
        let params_file = Self::write_params(params)?;
        let mut cmd = self.command("predict", &self.commands.predict)?;
        cmd.arg("--params").arg(params_file.path());
        cmd.arg("--out-dir").arg(out_dir);
        cmd.arg("--checkpoint").arg(checkpoint.to_string());
        if let Some(mask) = mask {
            cmd.arg("--mask").arg(mask);
        }
        for dir in case_dirs {
            cmd.arg("--case").arg(dir);
        }

        let stdout = Self::run("predict", cmd)?;
        last_line(&stdout)
            .map(PathBuf::from)
            .ok_or_else(|| SegmaskError::Backend("predict command printed no probability path".to_string()))
    }
}

impl Postprocessor for ProcessBackend {
    fn convert(&self, probabilities: &Path, output: &Path, options: &PostprocessOptions) -> SegmaskResult<PathBuf> {
        let mut cmd = self.command("postprocess", &self.commands.postprocess)?;
        cmd.arg("--prob").arg(probabilities);
        cmd.arg("--output").arg(output);
        cmd.arg("--threshold").arg(options.threshold.to_string());
        if options.clean {
            cmd.arg("--clean");
        }
        Self::run("postprocess", cmd)?;
        Ok(output.to_path_buf())
    }
}

impl EvaluationBackend for ProcessBackend {
    type Model = ProcessModel;
    type Dataset = EvalData;

    fn build_model(&self, params: &ResolvedParams) -> SegmaskResult<ProcessModel> {
        Ok(ProcessModel { params_file: Self::write_params(params)?, checkpoint: None })
    }

    fn load_weights(&self, model: &mut ProcessModel, checkpoint: &Path) -> SegmaskResult<()> {
        if !checkpoint.is_file() {
            return Err(SegmaskError::Backend(format!(
                "checkpoint file is not readable: {}",
                checkpoint.display()
            )));
        }
        model.checkpoint = Some(checkpoint.to_path_buf());
        Ok(())
    }

    fn dataset_from_directories(
        &self,
        _params: &ResolvedParams,
        dirs: &[PathBuf],
        mode: DatasetMode,
    ) -> SegmaskResult<EvalData> {
        debug!(%mode, directories = dirs.len(), "dataset will be built by the evaluate command");
        Ok(EvalData::Directories { paths: dirs.to_vec() })
    }

    fn load_cached_dataset(&self, path: &Path) -> SegmaskResult<EvalData> {
        if !path.is_dir() {
            return Err(SegmaskError::Backend(format!("cached dataset not found: {}", path.display())));
        }
        Ok(EvalData::Cached { path: path.to_path_buf() })
    }

    fn evaluate(&self, model: &ProcessModel, dataset: &EvalData) -> SegmaskResult<Vec<f64>> {
        let checkpoint = model
            .checkpoint
            .as_ref()
            .ok_or_else(|| SegmaskError::Backend("model weights were never loaded".to_string()))?;

        let mut cmd = self.command("evaluate", &self.commands.evaluate)?;
        cmd.arg("--params").arg(model.params_file.path());
        cmd.arg("--checkpoint").arg(checkpoint);
        match dataset {
            EvalData::Directories { paths } => {
                for dir in paths {
                    cmd.arg("--data-dir").arg(dir);
                }
            }
            EvalData::Cached { path } => {
                cmd.arg("--dataset").arg(path);
            }
        }

        let stdout = Self::run("evaluate", cmd)?;
        let line = last_line(&stdout)
            .ok_or_else(|| SegmaskError::Backend("evaluate command printed no results".to_string()))?;
        serde_json::from_str(line)
            .map_err(|e| SegmaskError::Backend(format!("unreadable evaluation results {line:?}: {e}")))
    }
}

impl Runtime for ProcessBackend {
    fn release(&self) {
        debug!("no accelerator context held in-process; collaborators exit after every call");
    }
}
