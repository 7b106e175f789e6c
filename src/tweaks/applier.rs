// src/tweaks/applier.rs

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::{
    backup::BackupLedger,
    errors::TweakError,
    tweaks::TweakDefinition,
    utils::{
        registry::{RegistryLocation, RegistryStore, RegistryValue},
        windows::ElevationProbe,
    },
};

/// Applies and reverts registry tweaks with snapshot, write and read-back verification.
pub struct RegistryApplier {
    registry: Arc<dyn RegistryStore>,
    ledger: Arc<BackupLedger>,
    elevation: Arc<dyn ElevationProbe>,
}

impl RegistryApplier {
    pub fn new(
        registry: Arc<dyn RegistryStore>,
        ledger: Arc<BackupLedger>,
        elevation: Arc<dyn ElevationProbe>,
    ) -> Self {
        Self {
            registry,
            ledger,
            elevation,
        }
    }

    pub fn ledger(&self) -> &Arc<BackupLedger> {
        &self.ledger
    }

    /// Applies the tweak's enabled value.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the value was written and reads back as intended.
    /// - `Err(TweakError::TargetUnresolved)` if the tweak has no usable target; nothing is touched.
    /// - `Err(TweakError::PermissionDenied)` for machine-wide targets without elevation; nothing is touched.
    /// - `Err(TweakError::WriteVerification)` if the write was accepted but did not take effect.
    pub fn apply(&self, tweak: &TweakDefinition) -> Result<(), TweakError> {
        debug!("{} -> Applying tweak.", tweak.id);
        let location = resolve(tweak)?;
        self.ensure_privilege(&location, tweak.key)?;

        self.ledger.snapshot_registry_value(&location, tweak.key);
        self.write_verified(tweak, &location, &tweak.enabled_value)
            .inspect_err(|e| error!("{} -> Failed to apply: {}", tweak.id, e))?;

        info!("{} -> Applied.", tweak.id);
        Ok(())
    }

    /// Writes the tweak's disabled value. This does not consult the ledger; it puts
    /// the catalog default back, not the value captured before the first apply.
    pub fn revert(&self, tweak: &TweakDefinition) -> Result<(), TweakError> {
        debug!("{} -> Reverting tweak.", tweak.id);
        let location = resolve(tweak)?;
        let disabled = tweak
            .disabled_value
            .as_ref()
            .ok_or_else(|| TweakError::NotRevertible(tweak.id.to_string()))?;
        self.ensure_privilege(&location, tweak.key)?;

        self.write_verified(tweak, &location, disabled)
            .inspect_err(|e| error!("{} -> Failed to revert: {}", tweak.id, e))?;

        info!("{} -> Reverted.", tweak.id);
        Ok(())
    }

    /// Whether the target currently holds the enabled value, compared as text.
    /// Any failure to read counts as not applied.
    pub fn is_applied(&self, tweak: &TweakDefinition) -> bool {
        let Ok(location) = resolve(tweak) else {
            return false;
        };
        match self.registry.read_value(&location, tweak.key) {
            Ok(Some(current)) => current.text_eq(&tweak.enabled_value),
            Ok(None) => false,
            Err(e) => {
                debug!("{} -> Could not read state: {}", tweak.id, e);
                false
            }
        }
    }

    fn ensure_privilege(&self, location: &RegistryLocation, key: &str) -> Result<(), TweakError> {
        if location.hive.is_machine_wide() && !self.elevation.is_elevated() {
            return Err(TweakError::PermissionDenied {
                target: location.value_path(key),
            });
        }
        Ok(())
    }

    fn write_verified(
        &self,
        tweak: &TweakDefinition,
        location: &RegistryLocation,
        value: &RegistryValue,
    ) -> Result<(), TweakError> {
        self.registry.write_value(location, tweak.key, value)?;

        let found = self.registry.read_value(location, tweak.key)?;
        match found {
            Some(current) if current.text_eq(value) => Ok(()),
            other => Err(TweakError::WriteVerification {
                target: location.value_path(tweak.key),
                expected: value.as_text(),
                found: other
                    .map(|v| v.as_text())
                    .unwrap_or_else(|| "<absent>".to_string()),
            }),
        }
    }
}

fn resolve(tweak: &TweakDefinition) -> Result<RegistryLocation, TweakError> {
    if tweak.path.is_empty() || tweak.key.is_empty() {
        return Err(TweakError::TargetUnresolved {
            id: tweak.id.to_string(),
            reason: "registry path or value name is empty".to_string(),
        });
    }
    RegistryLocation::parse(tweak.path).map_err(|e| TweakError::TargetUnresolved {
        id: tweak.id.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{FakeServiceControl, FixedElevation, MemoryRegistry},
        tweaks::{RiskLevel, TweakCategory},
    };

    const THROTTLE_PATH: &str =
        "HKLM\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile";

    fn applier(elevated: bool) -> (Arc<MemoryRegistry>, RegistryApplier) {
        let registry = Arc::new(MemoryRegistry::new());
        let ledger = Arc::new(BackupLedger::new(
            registry.clone(),
            Arc::new(FakeServiceControl::new()),
            std::env::temp_dir(),
        ));
        let applier = RegistryApplier::new(
            registry.clone(),
            ledger,
            Arc::new(FixedElevation(elevated)),
        );
        (registry, applier)
    }

    fn tweak(id: &'static str, path: &'static str, key: &'static str) -> TweakDefinition {
        TweakDefinition {
            id,
            name: "Test",
            description: "Test tweak",
            category: TweakCategory::Performance,
            risk: RiskLevel::Safe,
            path,
            key,
            enabled_value: RegistryValue::Dword(u32::MAX),
            disabled_value: Some(RegistryValue::Dword(10)),
        }
    }

    #[test]
    fn test_apply_then_revert_toggles_state() {
        let (registry, applier) = applier(true);
        let throttle = tweak("network_throttling", THROTTLE_PATH, "NetworkThrottlingIndex");
        registry.set(THROTTLE_PATH, "NetworkThrottlingIndex", RegistryValue::Dword(10));

        applier.apply(&throttle).unwrap();
        assert!(applier.is_applied(&throttle));

        applier.revert(&throttle).unwrap();
        assert!(!applier.is_applied(&throttle));
        assert_eq!(
            registry.get(THROTTLE_PATH, "NetworkThrottlingIndex"),
            Some(RegistryValue::Dword(10))
        );
        assert_eq!(applier.ledger().count(), 1);
    }

    #[test]
    fn test_apply_twice_keeps_one_backup_and_writes_twice() {
        let (registry, applier) = applier(true);
        let throttle = tweak("network_throttling", THROTTLE_PATH, "NetworkThrottlingIndex");

        applier.apply(&throttle).unwrap();
        applier.apply(&throttle).unwrap();

        assert_eq!(registry.write_count(), 2);
        assert_eq!(applier.ledger().count(), 1);
    }

    #[test]
    fn test_shared_target_restores_true_original() {
        let (registry, applier) = applier(true);
        let general = tweak("network_throttling", THROTTLE_PATH, "NetworkThrottlingIndex");
        let mut network = tweak("network_throttling_off", THROTTLE_PATH, "NetworkThrottlingIndex");
        network.enabled_value = RegistryValue::Dword(20);
        registry.set(THROTTLE_PATH, "NetworkThrottlingIndex", RegistryValue::Dword(14));

        applier.apply(&general).unwrap();
        applier.apply(&network).unwrap();
        assert_eq!(applier.ledger().count(), 1);
        assert_eq!(
            registry.get(THROTTLE_PATH, "NetworkThrottlingIndex"),
            Some(RegistryValue::Dword(20))
        );

        let report = applier.ledger().restore_all();
        assert!(report.is_complete());
        assert_eq!(
            registry.get(THROTTLE_PATH, "NetworkThrottlingIndex"),
            Some(RegistryValue::Dword(14))
        );
    }

    #[test]
    fn test_machine_wide_without_elevation_touches_nothing() {
        let (registry, applier) = applier(false);
        let throttle = tweak("network_throttling", THROTTLE_PATH, "NetworkThrottlingIndex");

        let err = applier.apply(&throttle).unwrap_err();
        assert!(err.is_permission());
        assert_eq!(registry.write_count(), 0);
        assert!(applier.ledger().is_empty());

        assert!(applier.revert(&throttle).unwrap_err().is_permission());
        assert_eq!(registry.write_count(), 0);
    }

    #[test]
    fn test_per_user_target_needs_no_elevation() {
        let (_, applier) = applier(false);
        let game_mode = tweak(
            "game_mode",
            "HKCU\\SOFTWARE\\Microsoft\\GameBar",
            "AutoGameModeEnabled",
        );
        applier.apply(&game_mode).unwrap();
        assert!(applier.is_applied(&game_mode));
    }

    #[test]
    fn test_unresolved_target_fails_fast() {
        let (registry, applier) = applier(true);
        for broken in [
            tweak("no_path", "", "Value"),
            tweak("no_key", "HKCU\\Software\\Test", ""),
            tweak("bad_hive", "HKXX\\Software\\Test", "Value"),
        ] {
            assert!(matches!(
                applier.apply(&broken),
                Err(TweakError::TargetUnresolved { .. })
            ));
            assert!(!applier.is_applied(&broken));
        }
        assert_eq!(registry.write_count(), 0);
        assert!(applier.ledger().is_empty());
    }

    #[test]
    fn test_silently_ignored_write_is_a_verification_failure() {
        let (registry, applier) = applier(true);
        let throttle = tweak("network_throttling", THROTTLE_PATH, "NetworkThrottlingIndex");
        registry.set(THROTTLE_PATH, "NetworkThrottlingIndex", RegistryValue::Dword(10));
        registry.lock_value(THROTTLE_PATH, "NetworkThrottlingIndex");

        match applier.apply(&throttle) {
            Err(TweakError::WriteVerification {
                expected, found, ..
            }) => {
                assert_eq!(expected, u32::MAX.to_string());
                assert_eq!(found, "10");
            }
            other => panic!("expected verification failure, got {:?}", other),
        }
        assert!(!applier.is_applied(&throttle));
    }

    #[test]
    fn test_write_error_is_not_verification_error() {
        let (registry, applier) = applier(true);
        registry.fail_writes(true);
        let throttle = tweak("network_throttling", THROTTLE_PATH, "NetworkThrottlingIndex");
        assert!(matches!(
            applier.apply(&throttle),
            Err(TweakError::Registry(_))
        ));
    }

    #[test]
    fn test_apply_only_tweak_cannot_revert() {
        let (_, applier) = applier(true);
        let mut one_way = tweak("one_way", "HKCU\\Software\\Test", "Value");
        one_way.disabled_value = None;
        assert!(matches!(
            applier.revert(&one_way),
            Err(TweakError::NotRevertible(id)) if id == "one_way"
        ));
    }

    #[test]
    fn test_read_error_counts_as_not_applied() {
        let (registry, applier) = applier(true);
        let game_mode = tweak(
            "game_mode",
            "HKCU\\SOFTWARE\\Microsoft\\GameBar",
            "AutoGameModeEnabled",
        );
        applier.apply(&game_mode).unwrap();
        registry.fail_reads(true);
        assert!(!applier.is_applied(&game_mode));
    }
}
