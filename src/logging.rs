// src/logging.rs

use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tracing::warn;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{config::Config, constants::LOG_FILE_PREFIX};

pub fn log_file_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    log_dir.join(format!("{}{}.log", LOG_FILE_PREFIX, date.format("%Y-%m-%d")))
}

fn open_log_file(log_dir: &Path) -> Result<File> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let path = log_file_path(log_dir, Local::now().date_naive());
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Installs the global subscriber: stdout always, plus the daily log file when enabled.
/// A log file that cannot be opened is reported and skipped.
pub fn init(config: &Config, level: LevelFilter) -> Result<()> {
    let (file, file_error) = if config.log_to_file {
        match open_log_file(&config.log_dir) {
            Ok(file) => (Some(file), None),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };
    let file_layer = file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(level)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .context("Failed to set global subscriber.")?;

    if let Some(e) = file_error {
        warn!("Logging to file disabled: {:#}", e);
    }
    Ok(())
}
