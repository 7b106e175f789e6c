// src/privacy.rs

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use crate::{
    constants::{HOSTS_BLOCK_BEGIN, HOSTS_BLOCK_END},
    errors::TweakError,
    tweaks::{DomainKind, RegistryApplier, RiskLevel, TweakCategory, TweakDefinition, TweakDomain},
    utils::{
        registry::RegistryValue::{Dword, String as Text},
        windows::ElevationProbe,
    },
};

/// Microsoft telemetry endpoints redirected to `0.0.0.0` by [`PrivacyService::block_telemetry_hosts`].
pub const TELEMETRY_HOSTS: [&str; 14] = [
    "vortex.data.microsoft.com",
    "vortex-win.data.microsoft.com",
    "telecommand.telemetry.microsoft.com",
    "telecommand.telemetry.microsoft.com.nsatc.net",
    "oca.telemetry.microsoft.com",
    "oca.telemetry.microsoft.com.nsatc.net",
    "sqm.telemetry.microsoft.com",
    "sqm.telemetry.microsoft.com.nsatc.net",
    "watson.telemetry.microsoft.com",
    "watson.telemetry.microsoft.com.nsatc.net",
    "redir.metaservices.microsoft.com",
    "choice.microsoft.com",
    "choice.microsoft.com.nsatc.net",
    "settings-sandbox.data.microsoft.com",
];

pub static PRIVACY_TWEAKS: Lazy<Vec<TweakDefinition>> = Lazy::new(|| {
    vec![
        TweakDefinition {
            id: "disable_telemetry",
            name: "Disable Telemetry",
            description: "Sets telemetry collection to the minimum (security only).",
            category: TweakCategory::Telemetry,
            risk: RiskLevel::Safe,
            path: "HKLM\\SOFTWARE\\Policies\\Microsoft\\Windows\\DataCollection",
            key: "AllowTelemetry",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(3)),
        },
        TweakDefinition {
            id: "disable_advertising_id",
            name: "Disable Advertising ID",
            description: "Prevents apps from using the advertising ID for targeted ads.",
            category: TweakCategory::Privacy,
            risk: RiskLevel::Safe,
            path: "HKCU\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\AdvertisingInfo",
            key: "Enabled",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "disable_activity_history",
            name: "Disable Activity History",
            description: "Stops Windows from collecting activity history.",
            category: TweakCategory::Privacy,
            risk: RiskLevel::Safe,
            path: "HKLM\\SOFTWARE\\Policies\\Microsoft\\Windows\\System",
            key: "EnableActivityFeed",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "disable_activity_upload",
            name: "Disable Activity History Upload",
            description: "Stops activity history from being uploaded to Microsoft.",
            category: TweakCategory::Privacy,
            risk: RiskLevel::Safe,
            path: "HKLM\\SOFTWARE\\Policies\\Microsoft\\Windows\\System",
            key: "UploadUserActivities",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "disable_feedback",
            name: "Disable Feedback Notifications",
            description: "Stops Windows from asking for feedback.",
            category: TweakCategory::Privacy,
            risk: RiskLevel::Safe,
            path: "HKCU\\SOFTWARE\\Microsoft\\Siuf\\Rules",
            key: "NumberOfSIUFInPeriod",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "disable_location_tracking",
            name: "Disable Location Tracking",
            description: "Disables the system-wide location service.",
            category: TweakCategory::Privacy,
            risk: RiskLevel::Safe,
            path: "HKLM\\SOFTWARE\\Policies\\Microsoft\\Windows\\LocationAndSensors",
            key: "DisableLocation",
            enabled_value: Dword(1),
            disabled_value: Some(Dword(0)),
        },
        TweakDefinition {
            id: "disable_app_diagnostics",
            name: "Disable App Diagnostics",
            description: "Prevents apps from accessing diagnostic data.",
            category: TweakCategory::Privacy,
            risk: RiskLevel::Safe,
            path: "HKCU\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\DeviceAccess\\Global\\{2297E4E2-5DBE-466D-A12B-0F8286F0D9CA}",
            key: "Value",
            enabled_value: Text("Deny".to_string()),
            disabled_value: Some(Text("Allow".to_string())),
        },
        TweakDefinition {
            id: "disable_copilot",
            name: "Disable Windows Copilot",
            description: "Turns off the Copilot assistant (Windows 11 23H2 and later).",
            category: TweakCategory::Ai,
            risk: RiskLevel::Safe,
            path: "HKCU\\Software\\Policies\\Microsoft\\Windows\\WindowsCopilot",
            key: "TurnOffWindowsCopilot",
            enabled_value: Dword(1),
            disabled_value: Some(Dword(0)),
        },
        TweakDefinition {
            id: "disable_recall",
            name: "Disable Windows Recall",
            description: "Disables the Recall screenshot history feature.",
            category: TweakCategory::Ai,
            risk: RiskLevel::Safe,
            path: "HKCU\\Software\\Policies\\Microsoft\\Windows\\WindowsAI",
            key: "DisableAIDataAnalysis",
            enabled_value: Dword(1),
            disabled_value: Some(Dword(0)),
        },
    ]
});

/// Privacy registry tweaks and the telemetry hosts-file block.
pub struct PrivacyService {
    applier: Arc<RegistryApplier>,
    elevation: Arc<dyn ElevationProbe>,
    hosts_file: PathBuf,
}

impl PrivacyService {
    pub fn new(
        applier: Arc<RegistryApplier>,
        elevation: Arc<dyn ElevationProbe>,
        hosts_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            applier,
            elevation,
            hosts_file: hosts_file.into(),
        }
    }

    pub fn hosts_file(&self) -> &Path {
        &self.hosts_file
    }

    fn require_elevation(&self) -> Result<(), TweakError> {
        if self.elevation.is_elevated() {
            Ok(())
        } else {
            Err(TweakError::PermissionDenied {
                target: self.hosts_file.display().to_string(),
            })
        }
    }

    /// Adds a marked block redirecting every telemetry host not yet listed.
    ///
    /// # Returns
    ///
    /// - `Ok(n)` with the number of hosts added; `0` when all are already blocked.
    pub fn block_telemetry_hosts(&self) -> Result<usize, TweakError> {
        self.require_elevation()?;
        let existing = read_hosts(&self.hosts_file)?;

        let missing: Vec<&str> = TELEMETRY_HOSTS
            .iter()
            .copied()
            .filter(|host| !lists_host(&existing, host))
            .collect();
        if missing.is_empty() {
            debug!("All telemetry hosts already blocked.");
            return Ok(0);
        }

        let mut content = existing;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(HOSTS_BLOCK_BEGIN);
        content.push('\n');
        for host in &missing {
            content.push_str(&format!("0.0.0.0 {}\n", host));
        }
        content.push_str(HOSTS_BLOCK_END);
        content.push('\n');

        fs::write(&self.hosts_file, content)?;
        info!(
            "Blocked {} telemetry hosts in {}",
            missing.len(),
            self.hosts_file.display()
        );
        Ok(missing.len())
    }

    /// Removes every marked block added by [`Self::block_telemetry_hosts`].
    ///
    /// # Returns
    ///
    /// - `Ok(n)` with the number of host entries removed.
    pub fn unblock_telemetry_hosts(&self) -> Result<usize, TweakError> {
        self.require_elevation()?;
        let existing = read_hosts(&self.hosts_file)?;

        let mut kept = Vec::new();
        let mut removed = 0;
        // Lines of a block are only dropped once its end marker is seen.
        let mut open_block: Option<Vec<&str>> = None;
        for line in existing.lines() {
            let trimmed = line.trim();
            if trimmed == HOSTS_BLOCK_BEGIN {
                if let Some(unclosed) = open_block.replace(vec![line]) {
                    kept.extend(unclosed);
                }
            } else if let Some(block) = open_block.as_mut() {
                block.push(line);
                if trimmed == HOSTS_BLOCK_END {
                    removed += block
                        .iter()
                        .map(|l| l.trim())
                        .filter(|l| !l.is_empty() && !l.starts_with('#'))
                        .count();
                    open_block = None;
                }
            } else {
                kept.push(line);
            }
        }
        if let Some(unclosed) = open_block {
            warn!(
                "{} -> Telemetry block has no end marker, leaving it in place.",
                self.hosts_file.display()
            );
            kept.extend(unclosed);
        }

        if removed == 0 && kept.len() == existing.lines().count() {
            debug!("No telemetry block found in {}", self.hosts_file.display());
            return Ok(0);
        }

        let mut content = kept.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(&self.hosts_file, content)?;
        info!(
            "Removed {} telemetry host entries from {}",
            removed,
            self.hosts_file.display()
        );
        Ok(removed)
    }

    /// Whether every telemetry host is currently redirected.
    pub fn telemetry_hosts_blocked(&self) -> bool {
        read_hosts(&self.hosts_file)
            .map(|content| TELEMETRY_HOSTS.iter().all(|host| lists_host(&content, host)))
            .unwrap_or(false)
    }
}

impl TweakDomain for PrivacyService {
    fn kind(&self) -> DomainKind {
        DomainKind::Privacy
    }

    fn tweaks(&self) -> &[TweakDefinition] {
        &PRIVACY_TWEAKS
    }

    fn applier(&self) -> &RegistryApplier {
        &self.applier
    }
}

fn read_hosts(path: &Path) -> Result<String, TweakError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Whether a non-comment hosts line maps `host`. Matches whole names only, so
/// `choice.microsoft.com` is not satisfied by `choice.microsoft.com.nsatc.net`.
fn lists_host(content: &str, host: &str) -> bool {
    content.lines().any(|line| {
        let entry = line.split('#').next().unwrap_or("");
        entry
            .split_whitespace()
            .skip(1)
            .any(|name| name.eq_ignore_ascii_case(host))
    })
}
