// src/tweaks/mod.rs

pub mod applier;
pub mod catalog;

use std::sync::Arc;

use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString};

pub use applier::RegistryApplier;

use crate::{
    errors::TweakError,
    utils::registry::{RegistryValue, ValueKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
pub enum TweakCategory {
    Gaming,
    Performance,
    Network,
    Latency,
    Throughput,
    Telemetry,
    Privacy,
    #[strum(serialize = "AI")]
    Ai,
}

/// How likely a tweak is to cause side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize)]
pub enum RiskLevel {
    Safe,
    Moderate,
    Advanced,
}

/// A single registry-backed tweak. Catalog entries are built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweakDefinition {
    /// Unique identifier within its catalog, e.g. `disable_game_bar`.
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: TweakCategory,
    pub risk: RiskLevel,
    /// Full key path, e.g. `HKCU\SOFTWARE\Microsoft\GameBar`.
    pub path: &'static str,
    /// Name of the value under `path`.
    pub key: &'static str,
    /// Value written when the tweak is applied.
    pub enabled_value: RegistryValue,
    /// Value written on revert. `None` makes the tweak apply-only.
    pub disabled_value: Option<RegistryValue>,
}

impl TweakDefinition {
    pub fn value_kind(&self) -> ValueKind {
        self.enabled_value.kind()
    }

    pub fn is_revertible(&self) -> bool {
        self.disabled_value.is_some()
    }
}

/// Which catalog a tweak belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum DomainKind {
    General,
    Network,
    Privacy,
}

/// A catalog of registry tweaks plus the operations every catalog supports.
///
/// Implementors only supply their catalog and the shared applier; every mutation
/// funnels through [`RegistryApplier`].
pub trait TweakDomain: Send + Sync {
    fn kind(&self) -> DomainKind;

    fn tweaks(&self) -> &[TweakDefinition];

    fn applier(&self) -> &RegistryApplier;

    fn find(&self, id: &str) -> Result<&TweakDefinition, TweakError> {
        self.tweaks()
            .iter()
            .find(|tweak| tweak.id == id)
            .ok_or_else(|| TweakError::UnknownItem(id.to_string()))
    }

    fn apply(&self, id: &str) -> Result<(), TweakError> {
        self.applier().apply(self.find(id)?)
    }

    fn revert(&self, id: &str) -> Result<(), TweakError> {
        self.applier().revert(self.find(id)?)
    }

    fn is_applied(&self, id: &str) -> Result<bool, TweakError> {
        Ok(self.applier().is_applied(self.find(id)?))
    }

    /// Current applied state of every tweak in the catalog.
    fn statuses(&self) -> Vec<(&'static str, bool)> {
        self.tweaks()
            .iter()
            .map(|tweak| (tweak.id, self.applier().is_applied(tweak)))
            .collect()
    }
}

/// General gaming and performance tweaks.
pub struct TweakEngine {
    applier: Arc<RegistryApplier>,
}

impl TweakEngine {
    pub fn new(applier: Arc<RegistryApplier>) -> Self {
        Self { applier }
    }
}

impl TweakDomain for TweakEngine {
    fn kind(&self) -> DomainKind {
        DomainKind::General
    }

    fn tweaks(&self) -> &[TweakDefinition] {
        &catalog::GENERAL_TWEAKS
    }

    fn applier(&self) -> &RegistryApplier {
        &self.applier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backup::BackupLedger,
        testing::{FakeServiceControl, FixedElevation, MemoryRegistry},
    };

    fn engine(elevated: bool) -> (Arc<MemoryRegistry>, Arc<BackupLedger>, TweakEngine) {
        let registry = Arc::new(MemoryRegistry::new());
        let ledger = Arc::new(BackupLedger::new(
            registry.clone(),
            Arc::new(FakeServiceControl::new()),
            std::env::temp_dir(),
        ));
        let applier = Arc::new(RegistryApplier::new(
            registry.clone(),
            ledger.clone(),
            Arc::new(FixedElevation(elevated)),
        ));
        (registry, ledger, TweakEngine::new(applier))
    }

    #[test]
    fn test_game_bar_scenario() {
        let (registry, ledger, engine) = engine(false);
        let path = "HKCU\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\GameDVR";
        registry.set(path, "AppCaptureEnabled", RegistryValue::Dword(1));

        engine.apply("disable_game_bar").unwrap();

        assert_eq!(ledger.count(), 1);
        let entry = ledger
            .entry(&format!("{}\\AppCaptureEnabled", path))
            .unwrap();
        assert!(entry.existed);
        assert_eq!(
            registry.get(path, "AppCaptureEnabled"),
            Some(RegistryValue::Dword(0))
        );
        assert!(engine.is_applied("disable_game_bar").unwrap());
    }

    #[test]
    fn test_unknown_id() {
        let (_, _, engine) = engine(true);
        assert!(matches!(
            engine.apply("overclock_everything"),
            Err(TweakError::UnknownItem(id)) if id == "overclock_everything"
        ));
        assert!(engine.is_applied("overclock_everything").is_err());
    }

    #[test]
    fn test_statuses_cover_catalog() {
        let (_, _, engine) = engine(true);
        engine.apply("game_mode").unwrap();

        let statuses = engine.statuses();
        assert_eq!(statuses.len(), catalog::GENERAL_TWEAKS.len());
        for (id, applied) in statuses {
            assert_eq!(applied, id == "game_mode", "unexpected state for {}", id);
        }
    }

    #[test]
    fn test_domain_kind_names() {
        assert_eq!("network".parse::<DomainKind>().unwrap(), DomainKind::Network);
        assert_eq!(DomainKind::General.to_string(), "general");
        assert_eq!(TweakCategory::Ai.to_string(), "AI");
    }
}
