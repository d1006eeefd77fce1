//! Subscriber setup for the `segmask` binary.
//!
//! Logs go to stderr so `--json` output on stdout stays machine readable.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, FmtSubscriber, Layer};

/// Size at which an existing log file is rolled over before appending.
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Map the 1-5 logging level onto tracing levels; 5 (critical) has no
/// tracing counterpart and shares ERROR.
pub fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        1 => Level::DEBUG,
        2 => Level::INFO,
        3 => Level::WARN,
        _ => Level::ERROR,
    }
}

pub fn init(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Console output plus an append-only copy in `log_file`.
pub fn init_with_log_file(level: Level, log_file: File) -> Result<()> {
    let filter = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(log_file))
                .with_filter(filter),
        )
        .try_init()
        .context("Failed to install log subscriber")?;
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".1");
    path.with_file_name(name)
}

/// Open `path` for appending. `overwrite` removes an existing file first;
/// otherwise a file past [`MAX_LOG_BYTES`] is moved to `<name>.1`.
pub fn open_log_file(path: &Path, overwrite: bool) -> Result<File> {
    if path.is_file() {
        if overwrite {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove existing log file {}", path.display()))?;
        } else if std::fs::metadata(path)?.len() > MAX_LOG_BYTES {
            std::fs::rename(path, backup_path(path))
                .with_context(|| format!("Failed to roll over log file {}", path.display()))?;
        }
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}
