//! Mask command implementation.

use super::load_backend;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use segmask_core::{
    discover_cases, resolve_trained_model, BatchReport, CaseOutcome, CheckpointSelector, MaskOptions, MaskRunner,
    Params, ResolveOptions, SkipReason, DEFAULT_SUFFIX, DEFAULT_THRESHOLD,
};
use std::path::PathBuf;

const DEFAULT_MODEL: &str = "t1-t1c-t2-flair";

#[derive(Args, Debug)]
pub struct MaskArgs {
    /// Name of the trained model configuration (see `segmask models`)
    #[arg(short = 'm', long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Suffixes replacing the model's expected input suffixes, in the same order
    #[arg(short = 'n', long, num_args = 1..)]
    pub names: Option<Vec<String>>,

    /// Case directory, or parent directory of case directories
    #[arg(short = 'i', long)]
    pub input_dir: PathBuf,

    /// Output directory for every mask (default: each case directory)
    #[arg(short = 'o', long)]
    pub out_dir: Option<PathBuf>,

    /// Filename suffix of the output mask
    #[arg(short = 's', long, default_value = DEFAULT_SUFFIX)]
    pub out_suffix: String,

    /// Probability threshold for predictions
    #[arg(short = 't', long, default_value_t = DEFAULT_THRESHOLD)]
    pub thresh: f32,

    /// Write thresholded probabilities without mask cleanup
    #[arg(short = 'p', long)]
    pub prob: bool,

    /// Overwrite existing masks
    #[arg(short = 'x', long)]
    pub overwrite: bool,

    /// Disable GPU and force all computation onto the CPU
    #[arg(short = 'f', long)]
    pub force_cpu: bool,

    /// Checkpoint used for inference: best, last, or a checkpoint file name
    #[arg(long, default_value = "last")]
    pub checkpoint: CheckpointSelector,

    /// Output the batch report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: MaskArgs) -> Result<()> {
    if let Some(out_dir) = &args.out_dir {
        if !out_dir.is_dir() {
            bail!("Output directory does not exist: {}", out_dir.display());
        }
    }

    let options = MaskOptions::new(&args.out_suffix)
        .context("Invalid output suffix")?
        .with_threshold(args.thresh)
        .context("Invalid probability threshold")?
        .with_output_dir(args.out_dir)
        .with_overwrite(args.overwrite)
        .with_clean(!args.prob)
        .with_checkpoint(args.checkpoint);

    let (config, backend) = load_backend(args.force_cpu)?;
    let param_file = resolve_trained_model(&config.models_dir(), &args.model)
        .with_context(|| format!("Invalid model name: {}", args.model))?;

    let mut resolve = ResolveOptions::new(&param_file);
    if let Some(names) = args.names {
        resolve = resolve.with_channel_overrides(names);
    }
    let params = Params::load(&param_file)
        .with_context(|| format!("Failed to load model parameters from {}", param_file.display()))?
        .resolve(&resolve)
        .context("Failed to resolve model parameters")?;

    let cases = discover_cases(&args.input_dir)
        .with_context(|| format!("Failed to discover cases in {}", args.input_dir.display()))?;

    let report = MaskRunner::new(&backend, &backend, &backend).run(&cases, &params, &options);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &BatchReport) {
    println!();
    println!("{}", format!("Mask Generation ({} cases)", report.records.len()).bold().cyan());
    println!();

    for record in &report.records {
        let status = match &record.outcome {
            CaseOutcome::Succeeded { output } => format!("{} {}", "✓".green(), output.display()),
            CaseOutcome::Skipped { reason: SkipReason::MissingInputs { missing } } => {
                format!("{} missing {}", "-".yellow(), missing.join(", "))
            }
            CaseOutcome::Skipped { reason: SkipReason::OutputExists { .. } } => {
                format!("{} mask exists", "-".yellow())
            }
            CaseOutcome::Failed { reason } => format!("{} {}", "✗".red(), reason),
        };
        println!("  {:<20} {}", record.case.id(), status);
    }

    println!();
    let failures = report.failures().len();
    let summary = format!(
        "Produced: {}  Skipped: {}  Failed: {}",
        report.outputs().len(),
        report.skipped().len(),
        failures
    );
    if failures == 0 {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
}
