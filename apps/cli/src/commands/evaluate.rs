//! Evaluate command implementation.

use super::load_backend;
use crate::logging;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use segmask_core::{run_evaluation, CheckpointSelector, EvalData, EvaluationReport, EvaluationRequest, Params, ResolveOptions};
use std::path::PathBuf;
use tracing::Level;

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Path to the model's params.json
    #[arg(short = 'p', long)]
    pub param_file: PathBuf,

    /// Checkpoint to evaluate: best, last, or a checkpoint file name
    #[arg(short = 'c', long, default_value = "last")]
    pub checkpoint: CheckpointSelector,

    /// Disable GPU and force all computation onto the CPU
    #[arg(short = 'f', long)]
    pub force_cpu: bool,

    /// Directories to evaluate (overrides the cached dataset and the manifest)
    #[arg(short = 'd', long, num_args = 1..)]
    pub directories: Option<Vec<PathBuf>>,

    /// Replace an existing eval.log instead of appending to it
    #[arg(short = 'x', long)]
    pub overwrite: bool,

    /// Output the evaluation report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: EvaluateArgs, level: Level) -> Result<()> {
    if !args.param_file.is_file() {
        bail!("No json configuration file found at {}", args.param_file.display());
    }
    for dir in args.directories.iter().flatten() {
        if !dir.is_dir() {
            bail!("Specified directory does not exist: {}", dir.display());
        }
    }

    let params = Params::load(&args.param_file)
        .with_context(|| format!("Failed to load model parameters from {}", args.param_file.display()))?
        .resolve(&ResolveOptions::new(&args.param_file))
        .context("Failed to resolve model parameters")?;

    let layout = params.layout();
    layout.ensure_evaluation_dir().context("Failed to create evaluation directory")?;
    let log_file = logging::open_log_file(&layout.eval_log_path(), args.overwrite)?;
    logging::init_with_log_file(level, log_file)?;

    let (_, backend) = load_backend(args.force_cpu)?;
    let request = EvaluationRequest { checkpoint: args.checkpoint, directories: args.directories };
    let report = run_evaluation(&backend, &backend, &params, &request).context("Evaluation failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &EvaluationReport) {
    println!();
    println!("{}", "Evaluation".bold().cyan());
    println!("  Checkpoint: {}", report.checkpoint.display());
    match &report.data {
        EvalData::Directories { paths } => println!("  Data:       {} directories", paths.len()),
        EvalData::Cached { path } => println!("  Data:       {}", path.display()),
    }
    println!();
    for metric in &report.metrics {
        println!("  {} = {:0.4}", metric.name, metric.value);
    }
    println!();
}
