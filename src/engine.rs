// src/engine.rs

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::{
    backup::BackupLedger,
    config::Config,
    debloat::DebloatService,
    drivers::DriverService,
    errors::TweakError,
    network::NetworkOptimizer,
    orchestrator::{TweakAction, TweakTask},
    power::PowerPlanService,
    privacy::PrivacyService,
    services::ServiceManager,
    tweaks::{DomainKind, RegistryApplier, TweakDomain, TweakEngine},
    utils::{
        command::CommandRunner, registry::RegistryStore, services::ServiceControl,
        windows::ElevationProbe,
    },
};

/// Owns the single backup ledger and every service that mutates system state through it.
pub struct Engine {
    config: Config,
    ledger: Arc<BackupLedger>,
    pub tweaks: Arc<TweakEngine>,
    pub network: Arc<NetworkOptimizer>,
    pub privacy: Arc<PrivacyService>,
    pub services: ServiceManager,
    pub power: PowerPlanService,
    pub debloat: DebloatService,
    pub drivers: DriverService,
}

impl Engine {
    /// Wires the live Windows registry, `sc.exe`, and the process token.
    #[cfg(windows)]
    pub fn new(config: Config) -> Result<Self> {
        use crate::utils::{
            command::SystemCommandRunner, registry::WinRegistry, services::ScServiceControl,
            windows::ProcessElevation,
        };

        let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);
        let services = Arc::new(ScServiceControl::new(
            runner.clone(),
            config.command_timeout(),
        ));
        Ok(Self::with_collaborators(
            config,
            Arc::new(WinRegistry),
            services,
            runner,
            Arc::new(ProcessElevation),
        ))
    }

    #[cfg(not(windows))]
    pub fn new(_config: Config) -> Result<Self> {
        anyhow::bail!("WinBoost only runs on Windows")
    }

    pub fn with_collaborators(
        config: Config,
        registry: Arc<dyn RegistryStore>,
        services: Arc<dyn ServiceControl>,
        runner: Arc<dyn CommandRunner>,
        elevation: Arc<dyn ElevationProbe>,
    ) -> Self {
        debug!("Backups go to {}", config.backup_dir.display());
        let ledger = Arc::new(BackupLedger::new(
            registry.clone(),
            services.clone(),
            config.backup_dir.clone(),
        ));
        let applier = Arc::new(RegistryApplier::new(
            registry,
            ledger.clone(),
            elevation.clone(),
        ));

        Self {
            tweaks: Arc::new(TweakEngine::new(applier.clone())),
            network: Arc::new(NetworkOptimizer::new(
                applier.clone(),
                runner.clone(),
                elevation.clone(),
                config.command_timeout(),
            )),
            privacy: Arc::new(PrivacyService::new(
                applier,
                elevation.clone(),
                config.hosts_file.clone(),
            )),
            services: ServiceManager::new(services, ledger.clone(), elevation.clone()),
            power: PowerPlanService::new(runner.clone(), elevation, config.command_timeout()),
            debloat: DebloatService::new(runner, config.powershell_timeout()),
            drivers: DriverService,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<BackupLedger> {
        &self.ledger
    }

    pub fn domain(&self, kind: DomainKind) -> Arc<dyn TweakDomain> {
        match kind {
            DomainKind::General => self.tweaks.clone(),
            DomainKind::Network => self.network.clone(),
            DomainKind::Privacy => self.privacy.clone(),
        }
    }

    pub fn domains(&self) -> [Arc<dyn TweakDomain>; 3] {
        [
            self.domain(DomainKind::General),
            self.domain(DomainKind::Network),
            self.domain(DomainKind::Privacy),
        ]
    }

    /// Looks a tweak id up across every catalog, general first.
    pub fn find_domain(&self, id: &str) -> Option<Arc<dyn TweakDomain>> {
        self.domains()
            .into_iter()
            .find(|domain| domain.find(id).is_ok())
    }

    /// Resolves every id to its catalog. Fails on the first unknown id, before any
    /// task exists.
    pub fn resolve_tasks(
        &self,
        ids: &[String],
        action: TweakAction,
    ) -> Result<Vec<TweakTask>, TweakError> {
        ids.iter()
            .map(|id| {
                let domain = self
                    .find_domain(id)
                    .ok_or_else(|| TweakError::UnknownItem(id.clone()))?;
                Ok(TweakTask {
                    id: id.clone(),
                    domain,
                    action,
                })
            })
            .collect()
    }
}
