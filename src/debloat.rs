// src/debloat.rs

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    errors::TweakError,
    utils::command::{execute_powershell_script, CommandRunner},
};

/// A preinstalled packaged app that is commonly removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BloatApp {
    pub package_name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
}

const fn app(
    package_name: &'static str,
    display_name: &'static str,
    description: &'static str,
) -> BloatApp {
    BloatApp {
        package_name,
        display_name,
        description,
    }
}

pub const KNOWN_BLOATWARE: [BloatApp; 26] = [
    app("Microsoft.BingWeather", "MSN Weather", "Weather app"),
    app("Microsoft.BingNews", "MSN News", "News app"),
    app("Microsoft.GetHelp", "Get Help", "Microsoft support app"),
    app("Microsoft.Getstarted", "Tips", "Windows tips app"),
    app("Microsoft.MicrosoftOfficeHub", "Office Hub", "Office promotion app"),
    app("Microsoft.MicrosoftSolitaireCollection", "Solitaire", "Solitaire games"),
    app("Microsoft.People", "People", "Contacts app"),
    app("Microsoft.WindowsFeedbackHub", "Feedback Hub", "Microsoft feedback"),
    app("Microsoft.Xbox.TCUI", "Xbox TCUI", "Xbox text and chat UI"),
    app("Microsoft.XboxApp", "Xbox App", "Xbox companion"),
    app("Microsoft.XboxSpeechToTextOverlay", "Xbox Speech", "Xbox speech overlay"),
    app("Microsoft.ZuneMusic", "Groove Music", "Music player"),
    app("Microsoft.ZuneVideo", "Movies & TV", "Video player"),
    app("Microsoft.WindowsMaps", "Windows Maps", "Maps app"),
    app("Microsoft.WindowsAlarms", "Alarms & Clock", "Clock and alarms"),
    app("Microsoft.YourPhone", "Phone Link", "Phone companion"),
    app("Microsoft.549981C3F5F10", "Cortana", "Cortana app"),
    app("Clipchamp.Clipchamp", "Clipchamp", "Video editor"),
    app("Microsoft.Todos", "Microsoft To Do", "Task management"),
    app("MicrosoftTeams", "Microsoft Teams", "Teams chat"),
    app("Microsoft.PowerAutomateDesktop", "Power Automate", "Automation tool"),
    app("Microsoft.MicrosoftStickyNotes", "Sticky Notes", "Sticky notes"),
    app("king.com.CandyCrushSaga", "Candy Crush Saga", "Preinstalled game"),
    app("king.com.CandyCrushFriends", "Candy Crush Friends", "Preinstalled game"),
    app("SpotifyAB.SpotifyMusic", "Spotify", "Preinstalled music app"),
    app("Disney.37853FC22B2CE", "Disney+", "Preinstalled streaming app"),
];

/// Outcome of a temp directory sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub bytes_freed: u64,
    pub files_removed: usize,
    /// Files that could not be deleted, usually because they are in use.
    pub files_skipped: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PackageList {
    Many(Vec<PackageName>),
    One(PackageName),
}

#[derive(Deserialize)]
struct PackageName {
    #[serde(rename = "Name")]
    name: String,
}

/// Package detection and removal through PowerShell, plus temp file cleanup.
pub struct DebloatService {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl DebloatService {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Names of every installed packaged app.
    pub fn installed_packages(&self) -> Result<Vec<String>, TweakError> {
        let output = execute_powershell_script(
            self.runner.as_ref(),
            "Get-AppxPackage | Select-Object -Property Name | ConvertTo-Json",
            self.timeout,
        )?;
        if output.is_empty() {
            return Ok(Vec::new());
        }

        let list: PackageList = serde_json::from_str(&output).map_err(|e| {
            TweakError::ExternalTool {
                program: "powershell.exe".to_string(),
                code: Some(0),
                output: format!("unexpected package list: {}", e),
            }
        })?;
        Ok(match list {
            PackageList::Many(packages) => packages.into_iter().map(|p| p.name).collect(),
            PackageList::One(package) => vec![package.name],
        })
    }

    /// Known bloatware entries that are currently installed.
    pub fn installed_bloatware(&self) -> Result<Vec<BloatApp>, TweakError> {
        let installed = self.installed_packages()?;
        Ok(KNOWN_BLOATWARE
            .iter()
            .filter(|known| {
                installed
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(known.package_name))
            })
            .copied()
            .collect())
    }

    /// Removes every package whose name contains `package_name`, then checks none is left.
    pub fn remove_app(&self, package_name: &str) -> Result<(), TweakError> {
        validate_package_name(package_name)?;
        debug!("{} -> Removing package.", package_name);

        execute_powershell_script(
            self.runner.as_ref(),
            &format!(
                "Get-AppxPackage *{}* | Remove-AppxPackage -ErrorAction SilentlyContinue",
                package_name
            ),
            self.timeout,
        )?;

        let remaining = execute_powershell_script(
            self.runner.as_ref(),
            &format!(
                "Get-AppxPackage *{}* | Select-Object -ExpandProperty Name",
                package_name
            ),
            self.timeout,
        )?;
        if !remaining.is_empty() {
            return Err(TweakError::WriteVerification {
                target: package_name.to_string(),
                expected: "not installed".to_string(),
                found: remaining.lines().collect::<Vec<_>>().join(", "),
            });
        }

        info!("{} -> Removed.", package_name);
        Ok(())
    }
}

/// Minimum number of letters and digits in a package name. Shorter fragments match
/// far too many packages once wrapped in `*..*`.
const MIN_PACKAGE_NAME_ALNUM: usize = 4;

/// Package names are interpolated into a PowerShell wildcard, so only the characters
/// that occur in real package family names are accepted, and the name must start with
/// a letter or digit.
pub fn validate_package_name(name: &str) -> Result<(), TweakError> {
    let valid = name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        && name.chars().filter(char::is_ascii_alphanumeric).count() >= MIN_PACKAGE_NAME_ALNUM;
    if valid {
        Ok(())
    } else {
        Err(TweakError::InvalidArgument(format!(
            "'{}' is not a valid package name",
            name
        )))
    }
}

/// Deletes every file below each existing directory. Files in use are skipped.
pub fn clean_temp_files(dirs: &[PathBuf]) -> CleanupReport {
    let mut report = CleanupReport::default();
    for dir in dirs.iter().filter(|dir| dir.is_dir()) {
        debug!("Cleaning {}", dir.display());
        clean_dir(dir, &mut report);
    }
    info!(
        "Temp cleanup freed {} bytes ({} files removed, {} skipped)",
        report.bytes_freed, report.files_removed, report.files_skipped
    );
    report
}

fn clean_dir(dir: &Path, report: &mut CleanupReport) {
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                report.bytes_freed += size;
                report.files_removed += 1;
            }
            Err(e) => {
                warn!("Could not delete {}: {}", entry.path().display(), e);
                report.files_skipped += 1;
            }
        }
    }
}
