//! Command implementations for the Segmask CLI.

pub mod evaluate;
pub mod mask;
pub mod models;

use anyhow::{Context, Result};
use segmask_core::{ProcessBackend, SegmaskConfig};

/// Backend wired from the discovered tool configuration.
fn load_backend(force_cpu: bool) -> Result<(SegmaskConfig, ProcessBackend)> {
    let config = SegmaskConfig::discover_and_load().context("Failed to load segmask configuration")?;
    if force_cpu {
        tracing::info!("Forcing CPU (no GPU) computation");
    }
    let backend = ProcessBackend::new(config.backend.clone()).with_force_cpu(force_cpu);
    Ok((config, backend))
}
