// src/constants.rs

pub const APP_NAME: &str = "WinBoost";

pub const BACKUP_DIR_NAME: &str = "Backups";
pub const LOG_DIR_NAME: &str = "Logs";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const BACKUP_FILE_PREFIX: &str = "backup_";
pub const LOG_FILE_PREFIX: &str = "winboost_";

// Bounds for external tools, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_POWERSHELL_TIMEOUT_SECS: u64 = 30;

// Ledger identity prefix for service targets.
pub const SERVICE_TARGET_PREFIX: &str = "SERVICE:";

// sc.exe exit code for a service that is not installed.
pub const SC_ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;

pub const ULTIMATE_PERFORMANCE_GUID: &str = "e9a42b02-d5df-448d-aa00-03f14749eb61";
pub const HIGH_PERFORMANCE_GUID: &str = "8c5e7fda-e8bf-4a96-9a85-a6e23a8c635c";
pub const BALANCED_GUID: &str = "381b4222-f694-41f0-9685-ff5bb260df2e";
pub const POWER_SAVER_GUID: &str = "a1841308-3541-4fab-bc81-f71556f20b4a";

pub const HOSTS_BLOCK_BEGIN: &str = "# WinBoost Telemetry Block";
pub const HOSTS_BLOCK_END: &str = "# End WinBoost Block";
