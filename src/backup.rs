// src/backup.rs

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    constants::{BACKUP_FILE_PREFIX, SERVICE_TARGET_PREFIX},
    errors::TweakError,
    utils::{
        registry::{RegistryLocation, RegistryStore, RegistryValue, ValueKind},
        services::{ServiceControl, StartupType},
    },
};

/// What a backup entry points at. Exactly one kind of target per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum BackupTarget {
    Registry {
        /// Canonical key path, e.g. `HKCU\Software\...`.
        path: String,
        key: String,
        original_value: Option<RegistryValue>,
        value_kind: Option<ValueKind>,
    },
    Service {
        service_name: String,
        original_startup_type: StartupType,
    },
}

impl BackupTarget {
    /// Identity in the spelling of the first snapshot.
    pub fn identity(&self) -> String {
        match self {
            Self::Registry { path, key, .. } => format!("{}\\{}", path, key),
            Self::Service { service_name, .. } => BackupLedger::service_identity(service_name),
        }
    }
}

/// Pre-mutation snapshot of a single target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    #[serde(flatten)]
    pub target: BackupTarget,
    /// Whether the target held a value before any tweak touched it. A registry entry
    /// with `existed == false` is restored by deleting the value.
    pub existed: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreFailure {
    pub id: String,
    pub error: String,
}

/// Per-entry outcome of a bulk restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    pub failed: Vec<RestoreFailure>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.restored.len() + self.failed.len()
    }
}

#[derive(Serialize)]
struct BackupRecord<'a> {
    id: String,
    #[serde(flatten)]
    entry: &'a BackupEntry,
}

/// Remembers the original state of every target touched during the session, once,
/// and replays it on demand.
///
/// Nothing here returns an error: a failed capture still records a best-effort entry,
/// and a failed restore is reported but does not stop the remaining restores.
pub struct BackupLedger {
    registry: Arc<dyn RegistryStore>,
    services: Arc<dyn ServiceControl>,
    backup_dir: PathBuf,
    entries: Mutex<IndexMap<String, BackupEntry>>,
}

impl BackupLedger {
    pub fn new(
        registry: Arc<dyn RegistryStore>,
        services: Arc<dyn ServiceControl>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            services,
            backup_dir: backup_dir.into(),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    pub fn registry_identity(location: &RegistryLocation, key: &str) -> String {
        location.value_path(key)
    }

    pub fn service_identity(service_name: &str) -> String {
        format!("{}{}", SERVICE_TARGET_PREFIX, service_name)
    }

    // Registry paths, value names and service names are case-insensitive.
    fn ledger_key(id: &str) -> String {
        id.to_ascii_uppercase()
    }

    // A poisoned lock still holds a consistent map; keep going with it.
    fn entries(&self) -> MutexGuard<'_, IndexMap<String, BackupEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Captures the current value at `location\key` unless that target is already held.
    pub fn snapshot_registry_value(&self, location: &RegistryLocation, key: &str) {
        let id = Self::registry_identity(location, key);
        let mut entries = self.entries();
        if entries.contains_key(&Self::ledger_key(&id)) {
            debug!("{} -> Already backed up, keeping first snapshot.", id);
            return;
        }

        let original_value = match self.registry.read_value(location, key) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "{} -> Could not read original value, restore will delete it: {}",
                    id, e
                );
                None
            }
        };
        let existed = original_value.is_some();
        let value_kind = original_value.as_ref().map(RegistryValue::kind);

        debug!(
            "{} -> Backed up {:?} (existed: {}).",
            id, original_value, existed
        );
        entries.insert(
            Self::ledger_key(&id),
            BackupEntry {
                target: BackupTarget::Registry {
                    path: location.to_string(),
                    key: key.to_string(),
                    original_value,
                    value_kind,
                },
                existed,
                timestamp: Utc::now(),
            },
        );
    }

    /// Records the startup mode a service had before it is changed.
    pub fn snapshot_service_state(&self, service_name: &str, startup: StartupType) {
        let id = Self::service_identity(service_name);
        let mut entries = self.entries();
        if entries.contains_key(&Self::ledger_key(&id)) {
            debug!("{} -> Already backed up, keeping first snapshot.", id);
            return;
        }

        debug!("{} -> Backed up startup type {}.", id, startup);
        entries.insert(
            Self::ledger_key(&id),
            BackupEntry {
                target: BackupTarget::Service {
                    service_name: service_name.to_string(),
                    original_startup_type: startup,
                },
                existed: true,
                timestamp: Utc::now(),
            },
        );
    }

    /// Puts every captured target back and empties the ledger, whatever the outcome.
    pub fn restore_all(&self) -> RestoreReport {
        let entries = std::mem::take(&mut *self.entries());
        let mut report = RestoreReport::default();

        info!("Restoring {} backed up targets.", entries.len());
        for entry in entries.into_values() {
            let id = entry.target.identity();
            match self.restore_entry(&entry) {
                Ok(()) => {
                    debug!("{} -> Restored.", id);
                    report.restored.push(id);
                }
                Err(e) => {
                    warn!("{} -> Restore failed: {}", id, e);
                    report.failed.push(RestoreFailure {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Restore finished: {} restored, {} failed.",
            report.restored.len(),
            report.failed.len()
        );
        report
    }

    fn restore_entry(&self, entry: &BackupEntry) -> Result<(), TweakError> {
        match &entry.target {
            BackupTarget::Registry {
                path,
                key,
                original_value,
                ..
            } => {
                let location = RegistryLocation::parse(path)?;
                match (entry.existed, original_value) {
                    (true, Some(value)) => self.registry.write_value(&location, key, value)?,
                    _ => self.registry.delete_value(&location, key)?,
                }
                Ok(())
            }
            BackupTarget::Service {
                service_name,
                original_startup_type,
            } => self
                .services
                .set_startup(service_name, original_startup_type.restorable()),
        }
    }

    /// Writes the ledger to a timestamped JSON file for manual recovery.
    ///
    /// Returns the file path, or `None` when the file could not be written.
    pub fn persist(&self) -> Option<PathBuf> {
        let json = {
            let entries = self.entries();
            let records: Vec<BackupRecord> = entries
                .values()
                .map(|entry| BackupRecord {
                    id: entry.target.identity(),
                    entry,
                })
                .collect();
            match serde_json::to_string_pretty(&records) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize backup ledger: {}", e);
                    return None;
                }
            }
        };

        match write_backup_file(&self.backup_dir, &json) {
            Ok(path) => {
                info!("Backup ledger saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!(
                    "Failed to save backup ledger to {}: {}",
                    self.backup_dir.display(),
                    e
                );
                None
            }
        }
    }

    pub fn count(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn entry(&self, id: &str) -> Option<BackupEntry> {
        self.entries().get(&Self::ledger_key(id)).cloned()
    }
}

fn write_backup_file(dir: &Path, json: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut path = dir.join(format!("{}{}.json", BACKUP_FILE_PREFIX, stamp));
    let mut suffix = 1;
    while path.exists() {
        path = dir.join(format!("{}{}_{}.json", BACKUP_FILE_PREFIX, stamp, suffix));
        suffix += 1;
    }
    fs::write(&path, json)?;
    Ok(path)
}
