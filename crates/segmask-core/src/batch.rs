//! Batch mask generation over discovered cases.
//!
//! Cases run strictly one after another: inference saturates the shared
//! accelerator, so overlapping cases would only contend for it. Every case
//! ends in exactly one [`CaseOutcome`]; nothing a single case does can abort
//! the rest of the batch.

use crate::backend::{Inference, PostprocessOptions, Postprocessor, Runtime, RuntimeGuard};
use crate::checkpoint::CheckpointSelector;
use crate::discovery::{check_inputs, Case, IMAGE_EXTENSION};
use crate::error::{SegmaskError, SegmaskResult};
use crate::params::ResolvedParams;
use crate::progress::{BatchEvent, BatchObserver, LogObserver};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_SUFFIX: &str = "brain_mask";
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Strip a trailing `.nii.gz` and reject suffixes that are not a plain name fragment.
pub fn normalize_suffix(suffix: &str) -> SegmaskResult<String> {
    let trimmed = suffix.strip_suffix(&format!(".{IMAGE_EXTENSION}")).unwrap_or(suffix);
    if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
        return Err(SegmaskError::InvalidSuffix(suffix.to_string()));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone)]
pub struct MaskOptions {
    /// Shared output directory; `None` writes into each case directory.
    pub output_dir: Option<PathBuf>,
    pub suffix: String,
    pub overwrite: bool,
    pub postprocess: PostprocessOptions,
    /// Checkpoint handed to inference.
    pub checkpoint: CheckpointSelector,
}

impl MaskOptions {
    pub fn new(suffix: &str) -> SegmaskResult<Self> {
        Ok(Self {
            output_dir: None,
            suffix: normalize_suffix(suffix)?,
            overwrite: false,
            postprocess: PostprocessOptions { threshold: DEFAULT_THRESHOLD, clean: true },
            checkpoint: CheckpointSelector::Last,
        })
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> SegmaskResult<Self> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(SegmaskError::InvalidThreshold(threshold));
        }
        self.postprocess.threshold = threshold;
        Ok(self)
    }

    #[must_use]
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.postprocess.clean = clean;
        self
    }

    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: CheckpointSelector) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    #[must_use]
    pub fn output_dir_for<'a>(&'a self, case: &'a Case) -> &'a Path {
        self.output_dir.as_deref().unwrap_or_else(|| case.path())
    }

    /// `<output_dir>/<case_id>_<suffix>.nii.gz`
    #[must_use]
    pub fn output_path(&self, case: &Case) -> PathBuf {
        self.output_dir_for(case)
            .join(format!("{}_{}.{IMAGE_EXTENSION}", case.id(), self.suffix))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    MissingInputs { missing: Vec<String> },
    OutputExists { output: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    Skipped { reason: SkipReason },
    Succeeded { output: PathBuf },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseRecord {
    pub case: Case,
    pub outcome: CaseOutcome,
}

/// Per-case outcomes of one batch, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub records: Vec<CaseRecord>,
}

impl BatchReport {
    /// Produced output paths.
    #[must_use]
    pub fn outputs(&self) -> Vec<&Path> {
        self.records
            .iter()
            .filter_map(|r| match &r.outcome {
                CaseOutcome::Succeeded { output } => Some(output.as_path()),
                _ => None,
            })
            .collect()
    }

    /// Cases for which no output was produced.
    #[must_use]
    pub fn failures(&self) -> Vec<&Case> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, CaseOutcome::Failed { .. }))
            .map(|r| &r.case)
            .collect()
    }

    #[must_use]
    pub fn skipped(&self) -> Vec<(&Case, &SkipReason)> {
        self.records
            .iter()
            .filter_map(|r| match &r.outcome {
                CaseOutcome::Skipped { reason } => Some((&r.case, reason)),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failures().is_empty()
    }
}

/// Drives inference and post-processing over a list of cases.
pub struct MaskRunner<'a> {
    inference: &'a dyn Inference,
    postprocessor: &'a dyn Postprocessor,
    runtime: &'a dyn Runtime,
    observer: &'a dyn BatchObserver,
}

impl<'a> MaskRunner<'a> {
    pub fn new(inference: &'a dyn Inference, postprocessor: &'a dyn Postprocessor, runtime: &'a dyn Runtime) -> Self {
        Self { inference, postprocessor, runtime, observer: &LogObserver }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn BatchObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Process every case in order. Always returns; failures are reported in
    /// the result, and the runtime is released once before returning.
    pub fn run(&self, cases: &[Case], params: &ResolvedParams, options: &MaskOptions) -> BatchReport {
        let runtime = RuntimeGuard::acquire(self.runtime);
        self.observer.on_event(&BatchEvent::Started { total: cases.len() });

        let mut report = BatchReport { records: Vec::with_capacity(cases.len()) };
        for case in cases {
            let case_path = case.path().to_path_buf();
            self.observer.on_event(&BatchEvent::CaseStarted { case: case_path.clone() });

            let outcome = self.process_case(case, params, options);
            let event = match &outcome {
                CaseOutcome::Skipped { reason } => {
                    BatchEvent::CaseSkipped { case: case_path, reason: reason.clone() }
                }
                CaseOutcome::Succeeded { output } => {
                    BatchEvent::CaseSucceeded { case: case_path, output: output.clone() }
                }
                CaseOutcome::Failed { reason } => BatchEvent::CaseFailed { case: case_path, reason: reason.clone() },
            };
            self.observer.on_event(&event);
            report.records.push(CaseRecord { case: case.clone(), outcome });
        }

        drop(runtime);

        self.observer.on_event(&BatchEvent::Finished {
            produced: report.outputs().len(),
            skipped: report.skipped().len(),
            failed: report.failures().iter().map(|c| c.path().to_path_buf()).collect(),
        });
        report
    }

    fn process_case(&self, case: &Case, params: &ResolvedParams, options: &MaskOptions) -> CaseOutcome {
        let check = match check_inputs(case, &params.channels) {
            Ok(check) => check,
            Err(e) => return CaseOutcome::Failed { reason: format!("input check failed: {e}") },
        };
        if !check.is_complete() {
            return CaseOutcome::Skipped { reason: SkipReason::MissingInputs { missing: check.missing } };
        }

        let output = options.output_path(case);
        if !options.overwrite && output.is_file() {
            return CaseOutcome::Skipped { reason: SkipReason::OutputExists { output } };
        }

        let probabilities = match self.inference.predict(
            params,
            &[case.path().to_path_buf()],
            options.output_dir_for(case),
            None,
            &options.checkpoint,
        ) {
            Ok(path) => path,
            Err(e) => return CaseOutcome::Failed { reason: format!("inference failed: {e}") },
        };

        match self.postprocessor.convert(&probabilities, &output, &options.postprocess) {
            Ok(written) if written.is_file() => CaseOutcome::Succeeded { output: written },
            Ok(written) => CaseOutcome::Failed { reason: format!("no output was written at {}", written.display()) },
            Err(e) => CaseOutcome::Failed { reason: format!("postprocessing failed: {e}") },
        }
    }
}
