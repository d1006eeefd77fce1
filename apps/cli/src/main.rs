//! Segmask CLI - batch brain-mask generation with trained CNN models
//!
//! This CLI provides a `segmask` command that runs a trained segmentation
//! model over directories of NIfTI cases and scores model checkpoints
//! against held-out data.

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use commands::evaluate::EvaluateArgs;
use commands::mask::MaskArgs;

/// Segmask CLI - CNN mask generation and checkpoint evaluation
#[derive(Parser, Debug)]
#[command(
    name = "segmask",
    author,
    version,
    about = "Segmask - batch CNN mask generation",
    long_about = "Segmask runs trained segmentation models over directories of NIfTI cases.\nInference, post-processing and scoring are delegated to the commands configured under [backend]."
)]
struct Args {
    /// Logging level: 1=DEBUG, 2=INFO, 3=WARN, 4=ERROR, 5=CRITICAL
    #[arg(
        short = 'l',
        long = "logging",
        default_value_t = 2,
        value_parser = clap::value_parser!(u8).range(1..=5),
        global = true
    )]
    logging: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate masks for one case or a directory of cases
    ///
    /// Cases missing a required input channel, or whose mask already exists,
    /// are skipped. A failing case never stops the batch.
    Mask(MaskArgs),

    /// Evaluate a model checkpoint
    ///
    /// Scores the selected checkpoint on explicit directories, the cached
    /// evaluation dataset, or the eval split of study_dirs_list.yml, and logs
    /// to <model_dir>/evaluation/eval.log.
    Evaluate(EvaluateArgs),

    /// List the trained model configurations available to `mask`
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = logging::level_from_verbosity(args.logging);

    match args.command {
        Command::Mask(cmd) => {
            logging::init(level)?;
            commands::mask::execute(cmd)
        }
        // installs its own subscriber once the model directory is known
        Command::Evaluate(cmd) => commands::evaluate::execute(cmd, level),
        Command::Models { json } => {
            logging::init(level)?;
            commands::models::execute(json)
        }
    }
}
