//! Models command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use segmask_core::{discover_trained_models, SegmaskConfig};

/// List trained model configurations under the models root.
pub fn execute(json_output: bool) -> Result<()> {
    let config = SegmaskConfig::discover_and_load().context("Failed to load segmask configuration")?;
    let models_dir = config.models_dir();
    let models = discover_trained_models(&models_dir)
        .with_context(|| format!("Failed to read models directory {}", models_dir.display()))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Trained Models ({})", models.len()).bold().cyan());
    println!("  {}", models_dir.display().to_string().dimmed());
    println!();

    if models.is_empty() {
        println!("  {}", "No trained models found.".dimmed());
        println!("  {}", "Set models_dir in .segmaskrc or SEGMASK_MODELS_DIR".dimmed());
        return Ok(());
    }

    for model in &models {
        println!("  {:<24} {}", model.name.cyan(), model.param_file.display().to_string().dimmed());
    }
    println!();

    Ok(())
}
