// src/errors.rs

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid registry path: {0}")]
    InvalidPath(String),

    #[error("Unsupported registry hive: {0}")]
    UnsupportedHive(String),

    #[error("Failed to open registry key: {0}")]
    KeyOpenError(String),

    #[error("Failed to read registry value: {0}")]
    ReadValueError(String),

    #[error("Failed to set registry value: {0}")]
    SetValueError(String),

    #[error("Failed to delete registry value: {0}")]
    DeleteValueError(String),
}

/// Errors surfaced by user-facing mutation operations.
///
/// Ledger-internal failures never reach this type; they are logged and folded into
/// the restore report instead.
#[derive(Error, Debug)]
pub enum TweakError {
    #[error("{id} -> no resolvable target: {reason}")]
    TargetUnresolved { id: String, reason: String },

    #[error("Administrator privileges required to modify {target}")]
    PermissionDenied { target: String },

    #[error("Write to {target} did not take effect: expected '{expected}', found '{found}'")]
    WriteVerification {
        target: String,
        expected: String,
        found: String,
    },

    #[error("{program} exited with code {code:?}: {output}")]
    ExternalTool {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} does not define a value to revert to")]
    NotRevertible(String),

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Service '{0}' does not exist on this system")]
    ServiceNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

impl TweakError {
    /// Whether the error stems from missing elevation, so callers can offer a restart as admin.
    pub fn is_permission(&self) -> bool {
        matches!(self, TweakError::PermissionDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_message_names_both_values() {
        let err = TweakError::WriteVerification {
            target: "HKCU\\Software\\Test\\Value".to_string(),
            expected: "0".to_string(),
            found: "1".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("expected '0'"));
        assert!(message.contains("found '1'"));
        assert!(!err.is_permission());
    }

    #[test]
    fn timeout_message_keeps_sub_second_precision() {
        let err = TweakError::Timeout {
            program: "powercfg".to_string(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "powercfg did not finish within 250ms");
    }

    #[test]
    fn registry_errors_convert_transparently() {
        let err: TweakError = RegistryError::UnsupportedHive("HKCR".to_string()).into();
        assert_eq!(err.to_string(), "Unsupported registry hive: HKCR");
    }
}
