// src/config.rs

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{
    APP_NAME, BACKUP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_COMMAND_TIMEOUT_SECS,
    DEFAULT_POWERSHELL_TIMEOUT_SECS, LOG_DIR_NAME,
};

/// Runtime settings. Every field is optional in the TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where `persist` writes backup files.
    pub backup_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_to_file: bool,
    /// Bound for `sc.exe`, `netsh` and `powercfg`.
    pub command_timeout_secs: u64,
    pub powershell_timeout_secs: u64,
    pub hosts_file: PathBuf,
    /// Directories swept by the temp cleanup.
    pub temp_dirs: Vec<PathBuf>,
}

/// `%LOCALAPPDATA%\WinBoost`, or a temp-dir fallback when the profile is unavailable.
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

fn system_root() -> PathBuf {
    std::env::var_os("SystemRoot")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("C:\\Windows"))
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = app_data_dir();
        let windows = system_root();
        let mut temp_dirs = vec![std::env::temp_dir()];
        if let Some(local) = dirs::data_local_dir() {
            temp_dirs.push(local.join("Temp"));
        }
        temp_dirs.push(windows.join("Temp"));
        temp_dirs.push(windows.join("SoftwareDistribution").join("Download"));
        temp_dirs.dedup();

        Self {
            backup_dir: data_dir.join(BACKUP_DIR_NAME),
            log_dir: data_dir.join(LOG_DIR_NAME),
            log_to_file: true,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            powershell_timeout_secs: DEFAULT_POWERSHELL_TIMEOUT_SECS,
            hosts_file: windows
                .join("System32")
                .join("drivers")
                .join("etc")
                .join("hosts"),
            temp_dirs,
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        app_data_dir().join(CONFIG_FILE_NAME)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML config")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Loads `path` if given, else the default config file if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let default_path = Self::default_path();
                if default_path.is_file() {
                    Self::load_from(&default_path)
                } else {
                    debug!("No config at {}, using defaults.", default_path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn powershell_timeout(&self) -> Duration {
        Duration::from_secs(self.powershell_timeout_secs)
    }
}
