// src/services.rs

use std::sync::Arc;

use serde::Serialize;
use strum_macros::Display;
use tracing::{debug, error, info, warn};

use crate::{
    backup::BackupLedger,
    errors::TweakError,
    utils::{
        services::{ServiceControl, ServiceState, StartupType},
        windows::ElevationProbe,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum ServiceCategory {
    Performance,
    Privacy,
    Bloat,
    Gaming,
    Hardware,
}

/// How much can break when the service is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize)]
pub enum ServiceRisk {
    Safe,
    Caution,
    Risky,
}

/// Catalog record for a service that is commonly safe to turn off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceDefinition {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub category: ServiceCategory,
    pub risk: ServiceRisk,
}

const fn service(
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    category: ServiceCategory,
    risk: ServiceRisk,
) -> ServiceDefinition {
    ServiceDefinition {
        name,
        display_name,
        description,
        category,
        risk,
    }
}

use ServiceCategory::*;
use ServiceRisk::*;

pub const SERVICE_DEFINITIONS: [ServiceDefinition; 18] = [
    service(
        "SysMain",
        "SysMain (Superfetch)",
        "Preloads apps into memory. Disabling saves RAM on SSD systems.",
        Performance,
        Safe,
    ),
    service(
        "WSearch",
        "Windows Search",
        "Indexes files for fast searching. Uses CPU and disk I/O.",
        Performance,
        Safe,
    ),
    service(
        "DiagTrack",
        "Connected User Experiences",
        "Telemetry service that sends data to Microsoft.",
        Privacy,
        Safe,
    ),
    service(
        "dmwappushservice",
        "WAP Push Message Routing",
        "Routes push messages for telemetry.",
        Privacy,
        Safe,
    ),
    service(
        "MapsBroker",
        "Downloaded Maps Manager",
        "Manages downloaded offline maps.",
        Bloat,
        Safe,
    ),
    service("Fax", "Fax", "Enables sending and receiving faxes.", Bloat, Safe),
    service(
        "Spooler",
        "Print Spooler",
        "Manages print jobs. Disable if no printer is used.",
        Bloat,
        Caution,
    ),
    service("lfsvc", "Geolocation Service", "Tracks device location.", Privacy, Safe),
    service("RetailDemo", "Retail Demo Service", "Demo mode for retail stores.", Bloat, Safe),
    service(
        "XblAuthManager",
        "Xbox Live Auth Manager",
        "Xbox Live authentication. Disable if Xbox services are unused.",
        Gaming,
        Caution,
    ),
    service(
        "XblGameSave",
        "Xbox Live Game Save",
        "Syncs Xbox game saves to the cloud.",
        Gaming,
        Caution,
    ),
    service(
        "XboxGipSvc",
        "Xbox Accessory Management",
        "Manages Xbox accessories.",
        Gaming,
        Caution,
    ),
    service(
        "XboxNetApiSvc",
        "Xbox Live Networking",
        "Xbox Live networking features.",
        Gaming,
        Caution,
    ),
    service(
        "bthserv",
        "Bluetooth Support",
        "Manages Bluetooth devices. Disable if Bluetooth is unused.",
        Hardware,
        Caution,
    ),
    service(
        "CDPUserSvc",
        "Connected Devices Platform",
        "Cross-device experience features.",
        Bloat,
        Safe,
    ),
    service(
        "PimIndexMaintenanceSvc",
        "Contact Data",
        "Indexes contact data for fast lookup.",
        Bloat,
        Safe,
    ),
    service(
        "WMPNetworkSvc",
        "Windows Media Player Network",
        "Shares the Windows Media Player library.",
        Bloat,
        Safe,
    ),
    service(
        "WerSvc",
        "Windows Error Reporting",
        "Sends crash reports to Microsoft.",
        Privacy,
        Safe,
    ),
];

/// A catalog service together with its freshly queried state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub definition: ServiceDefinition,
    pub state: ServiceState,
}

impl ServiceInfo {
    pub fn is_disabled(&self) -> bool {
        self.state.startup == StartupType::Disabled
    }
}

pub fn find_definition(name: &str) -> Option<&'static ServiceDefinition> {
    SERVICE_DEFINITIONS
        .iter()
        .find(|def| def.name.eq_ignore_ascii_case(name))
}

/// Disables and re-enables services, backing up each original startup mode once.
pub struct ServiceManager {
    services: Arc<dyn ServiceControl>,
    ledger: Arc<BackupLedger>,
    elevation: Arc<dyn ElevationProbe>,
}

impl ServiceManager {
    pub fn new(
        services: Arc<dyn ServiceControl>,
        ledger: Arc<BackupLedger>,
        elevation: Arc<dyn ElevationProbe>,
    ) -> Self {
        Self {
            services,
            ledger,
            elevation,
        }
    }

    /// Queries every catalog service. Services missing on this machine are skipped.
    pub fn optimizable_services(&self) -> Vec<ServiceInfo> {
        SERVICE_DEFINITIONS
            .iter()
            .filter_map(|definition| match self.services.query(definition.name) {
                Ok(state) => Some(ServiceInfo {
                    definition: *definition,
                    state,
                }),
                Err(e) => {
                    debug!("{} -> Skipped: {}", definition.name, e);
                    None
                }
            })
            .collect()
    }

    pub fn query(&self, name: &str) -> Result<ServiceState, TweakError> {
        self.services.query(name)
    }

    fn require_elevation(&self, name: &str) -> Result<(), TweakError> {
        if self.elevation.is_elevated() {
            Ok(())
        } else {
            Err(TweakError::PermissionDenied {
                target: BackupLedger::service_identity(name),
            })
        }
    }

    /// Disables a service and stops it if running.
    ///
    /// The startup mode seen before the first change is kept in the ledger. A failed
    /// stop is only logged; the disabled startup mode is what gets verified.
    pub fn disable(&self, name: &str) -> Result<(), TweakError> {
        debug!("{} -> Disabling service.", name);
        self.require_elevation(name)?;

        let current = self.services.query(name)?;
        self.ledger.snapshot_service_state(name, current.startup);

        self.services
            .set_startup(name, StartupType::Disabled)
            .inspect_err(|e| error!("{} -> Failed to disable: {}", name, e))?;

        if current.is_running() {
            if let Err(e) = self.services.stop(name) {
                warn!("{} -> Disabled but could not be stopped: {}", name, e);
            }
        }

        self.verify_startup(name, StartupType::Disabled)?;
        info!("{} -> Disabled.", name);
        Ok(())
    }

    /// Re-enables a service with the given startup mode (callers usually pass `Manual`).
    pub fn enable(&self, name: &str, startup: StartupType) -> Result<(), TweakError> {
        debug!("{} -> Enabling service as {}.", name, startup);
        self.require_elevation(name)?;

        self.services
            .set_startup(name, startup)
            .inspect_err(|e| error!("{} -> Failed to enable: {}", name, e))?;

        self.verify_startup(name, startup)?;
        info!("{} -> Enabled ({}).", name, startup);
        Ok(())
    }

    fn verify_startup(&self, name: &str, expected: StartupType) -> Result<(), TweakError> {
        let found = self.services.query(name)?.startup;
        if found == expected {
            Ok(())
        } else {
            Err(TweakError::WriteVerification {
                target: BackupLedger::service_identity(name),
                expected: expected.to_string(),
                found: found.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        testing::{FakeServiceControl, FixedElevation, MemoryRegistry},
        utils::services::RunState,
    };

    fn manager(elevated: bool) -> (Arc<FakeServiceControl>, Arc<BackupLedger>, ServiceManager) {
        let services = Arc::new(FakeServiceControl::new());
        let ledger = Arc::new(BackupLedger::new(
            Arc::new(MemoryRegistry::new()),
            services.clone(),
            std::env::temp_dir(),
        ));
        let manager = ServiceManager::new(
            services.clone(),
            ledger.clone(),
            Arc::new(FixedElevation(elevated)),
        );
        (services, ledger, manager)
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<_> = SERVICE_DEFINITIONS.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), SERVICE_DEFINITIONS.len());
        assert_eq!(find_definition("sysmain").unwrap().name, "SysMain");
        assert!(find_definition("NotAService").is_none());
    }

    #[test]
    fn test_optimizable_services_skips_missing() {
        let (services, _, manager) = manager(true);
        services.install("SysMain", StartupType::Automatic, RunState::Running);
        services.install("Fax", StartupType::Disabled, RunState::Stopped);

        let found = manager.optimizable_services();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].definition.name, "SysMain");
        assert!(found[0].state.is_running());
        assert!(found[1].is_disabled());
    }

    #[test]
    fn test_disable_snapshots_stops_and_verifies() {
        let (services, ledger, manager) = manager(true);
        services.install("SysMain", StartupType::Automatic, RunState::Running);

        manager.disable("SysMain").unwrap();

        let state = services.state_of("SysMain").unwrap();
        assert_eq!(state.startup, StartupType::Disabled);
        assert_eq!(state.run_state, RunState::Stopped);
        assert_eq!(ledger.count(), 1);

        // Enabling and disabling again keeps the first snapshot.
        manager.enable("SysMain", StartupType::Manual).unwrap();
        manager.disable("SysMain").unwrap();
        assert_eq!(ledger.count(), 1);

        ledger.restore_all();
        assert_eq!(services.startup_of("SysMain"), Some(StartupType::Automatic));
    }

    #[test]
    fn test_stop_failure_does_not_fail_disable() {
        let (services, _, manager) = manager(true);
        services.install("WSearch", StartupType::Automatic, RunState::Running);
        services.fail_stop(true);

        manager.disable("WSearch").unwrap();
        assert_eq!(services.startup_of("WSearch"), Some(StartupType::Disabled));
    }

    #[test]
    fn test_ignored_config_change_fails_verification() {
        let (services, _, manager) = manager(true);
        services.install("DiagTrack", StartupType::Automatic, RunState::Running);
        services.make_stuck("DiagTrack");

        match manager.disable("DiagTrack") {
            Err(TweakError::WriteVerification { target, expected, found }) => {
                assert_eq!(target, "SERVICE:DiagTrack");
                assert_eq!(expected, "Disabled");
                assert_eq!(found, "Automatic");
            }
            other => panic!("expected verification failure, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_service_is_reported_without_backup() {
        let (_, ledger, manager) = manager(true);
        assert!(matches!(
            manager.disable("Fax"),
            Err(TweakError::ServiceNotFound(name)) if name == "Fax"
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_service_changes_need_elevation() {
        let (services, ledger, manager) = manager(false);
        services.install("SysMain", StartupType::Automatic, RunState::Running);

        assert!(manager.disable("SysMain").unwrap_err().is_permission());
        assert!(manager
            .enable("SysMain", StartupType::Manual)
            .unwrap_err()
            .is_permission());
        assert_eq!(services.startup_of("SysMain"), Some(StartupType::Automatic));
        assert!(ledger.is_empty());
    }
}
