use crate::batch::SkipReason;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    Started { total: usize },
    CaseStarted { case: PathBuf },
    CaseSkipped { case: PathBuf, reason: SkipReason },
    CaseSucceeded { case: PathBuf, output: PathBuf },
    CaseFailed { case: PathBuf, reason: String },
    Finished { produced: usize, skipped: usize, failed: Vec<PathBuf> },
}

/// Receives the events of one batch run.
pub trait BatchObserver {
    fn on_event(&self, event: &BatchEvent);
}

/// Forwards batch events to `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl BatchObserver for LogObserver {
    fn on_event(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Started { total } => info!("Processing {total} case director{}", if *total == 1 { "y" } else { "ies" }),
            BatchEvent::CaseStarted { case } => info!("Processing the following directory: {}", case.display()),
            BatchEvent::CaseSkipped { case, reason } => match reason {
                SkipReason::MissingInputs { missing } => {
                    for suffix in missing {
                        info!(
                            "Directory {} is missing required file: {} and will be skipped...",
                            case.display(),
                            suffix
                        );
                    }
                }
                SkipReason::OutputExists { output } => {
                    info!("Mask file already exists at {} and overwrite argument is false", output.display());
                }
            },
            BatchEvent::CaseSucceeded { output, .. } => info!("Created mask file at: {}", output.display()),
            BatchEvent::CaseFailed { case, reason } => warn!(case = %case.display(), "{reason}"),
            BatchEvent::Finished { failed, .. } if failed.is_empty() => {}
            BatchEvent::Finished { failed, .. } => {
                let listing: Vec<String> = failed.iter().map(|p| p.display().to_string()).collect();
                info!("Mask generation failed for the following directories:\n{}", listing.join("\n"));
            }
        }
    }
}
