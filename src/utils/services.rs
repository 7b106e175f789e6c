// src/utils/services.rs

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::{
    constants::SC_ERROR_SERVICE_DOES_NOT_EXIST,
    errors::TweakError,
    utils::command::{CommandOutput, CommandRunner},
};

/// Startup mode of a Windows service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum StartupType {
    Automatic,
    Manual,
    Disabled,
    Boot,
    System,
}

impl StartupType {
    /// Keyword understood by `sc config <name> start= <keyword>`.
    pub fn sc_keyword(&self) -> &'static str {
        match self {
            StartupType::Automatic => "auto",
            StartupType::Manual => "demand",
            StartupType::Disabled => "disabled",
            StartupType::Boot => "boot",
            StartupType::System => "system",
        }
    }

    /// Startup mode used when putting a backed-up mode back. Only the three
    /// user-facing modes round-trip; anything else falls back to on-demand start.
    pub fn restorable(&self) -> StartupType {
        match self {
            StartupType::Automatic | StartupType::Manual | StartupType::Disabled => *self,
            _ => StartupType::Manual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum RunState {
    Running,
    Stopped,
    StartPending,
    StopPending,
    Paused,
    Unknown,
}

/// Runtime-observed state of a service, fetched fresh on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub run_state: RunState,
    pub startup: StartupType,
}

impl ServiceState {
    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }
}

/// Queries and changes service configuration.
pub trait ServiceControl: Send + Sync {
    fn query(&self, name: &str) -> Result<ServiceState, TweakError>;

    fn set_startup(&self, name: &str, startup: StartupType) -> Result<(), TweakError>;

    fn stop(&self, name: &str) -> Result<(), TweakError>;
}

/// `ServiceControl` implemented on top of `sc.exe`.
pub struct ScServiceControl {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl ScServiceControl {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    fn sc(&self, name: &str, args: &[&str]) -> Result<CommandOutput, TweakError> {
        let output = self.runner.run("sc.exe", args, self.timeout)?;
        if output.code == Some(SC_ERROR_SERVICE_DOES_NOT_EXIST) {
            return Err(TweakError::ServiceNotFound(name.to_string()));
        }
        output.into_success()
    }
}

impl ServiceControl for ScServiceControl {
    fn query(&self, name: &str) -> Result<ServiceState, TweakError> {
        let config = self.sc(name, &["qc", name])?;
        let status = self.sc(name, &["query", name])?;

        let startup = parse_start_type(&config.stdout).ok_or_else(|| TweakError::ExternalTool {
            program: "sc.exe".to_string(),
            code: config.code,
            output: format!("no START_TYPE in output: {}", config.stdout.trim()),
        })?;
        let run_state = parse_run_state(&status.stdout);

        debug!("{} -> {:?}, {:?}", name, run_state, startup);
        Ok(ServiceState { run_state, startup })
    }

    fn set_startup(&self, name: &str, startup: StartupType) -> Result<(), TweakError> {
        self.sc(name, &["config", name, "start=", startup.sc_keyword()])?;
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<(), TweakError> {
        self.sc(name, &["stop", name])?;
        Ok(())
    }
}

/// Extracts the startup mode from `sc qc` output, e.g.
/// `START_TYPE         : 2   AUTO_START  (DELAYED)`.
pub fn parse_start_type(output: &str) -> Option<StartupType> {
    let line = output.lines().find(|line| line.contains("START_TYPE"))?;
    if line.contains("AUTO_START") {
        Some(StartupType::Automatic)
    } else if line.contains("DEMAND_START") {
        Some(StartupType::Manual)
    } else if line.contains("DISABLED") {
        Some(StartupType::Disabled)
    } else if line.contains("BOOT_START") {
        Some(StartupType::Boot)
    } else if line.contains("SYSTEM_START") {
        Some(StartupType::System)
    } else {
        None
    }
}

/// Extracts the run state from `sc query` output, e.g. `STATE : 4  RUNNING`.
pub fn parse_run_state(output: &str) -> RunState {
    let Some(line) = output.lines().find(|line| line.contains("STATE")) else {
        return RunState::Unknown;
    };
    if line.contains("START_PENDING") {
        RunState::StartPending
    } else if line.contains("STOP_PENDING") {
        RunState::StopPending
    } else if line.contains("RUNNING") {
        RunState::Running
    } else if line.contains("STOPPED") {
        RunState::Stopped
    } else if line.contains("PAUSED") {
        RunState::Paused
    } else {
        RunState::Unknown
    }
}
