// src/network.rs

use std::{net::Ipv4Addr, sync::Arc, time::Duration};

use once_cell::sync::Lazy;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{debug, info, warn};

use crate::{
    errors::TweakError,
    tweaks::{
        catalog::{MULTIMEDIA_PROFILE, THROTTLING_OFF},
        DomainKind, RegistryApplier, RiskLevel, TweakCategory, TweakDefinition, TweakDomain,
    },
    utils::{command::CommandRunner, registry::RegistryValue::Dword, windows::ElevationProbe},
};

const TCPIP_PARAMETERS: &str = "HKLM\\SYSTEM\\CurrentControlSet\\Services\\Tcpip\\Parameters";

pub static NETWORK_TWEAKS: Lazy<Vec<TweakDefinition>> = Lazy::new(|| {
    vec![
        TweakDefinition {
            id: "disable_nagle",
            name: "Disable Nagle's Algorithm",
            description: "Sends packets immediately instead of buffering them, reducing latency.",
            category: TweakCategory::Latency,
            risk: RiskLevel::Safe,
            path: TCPIP_PARAMETERS,
            key: "TcpNoDelay",
            enabled_value: Dword(1),
            disabled_value: Some(Dword(0)),
        },
        TweakDefinition {
            id: "disable_tcp_timestamps",
            name: "Disable TCP Timestamps",
            description: "Disables TCP timestamps to reduce per-packet overhead.",
            category: TweakCategory::Latency,
            risk: RiskLevel::Moderate,
            path: TCPIP_PARAMETERS,
            key: "Tcp1323Opts",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(1)),
        },
        // Same target as the general `network_throttling` tweak.
        TweakDefinition {
            id: "network_throttling_off",
            name: "Disable Network Throttling",
            description: "Removes the 10-packet throttle on non-multimedia traffic.",
            category: TweakCategory::Throughput,
            risk: RiskLevel::Safe,
            path: MULTIMEDIA_PROFILE,
            key: "NetworkThrottlingIndex",
            enabled_value: Dword(THROTTLING_OFF),
            disabled_value: Some(Dword(10)),
        },
        TweakDefinition {
            id: "tcp_ack_frequency",
            name: "Optimize TCP ACK Frequency",
            description: "Acknowledges every TCP segment immediately for lower latency in games.",
            category: TweakCategory::Latency,
            risk: RiskLevel::Moderate,
            path: TCPIP_PARAMETERS,
            key: "TcpAckFrequency",
            enabled_value: Dword(1),
            disabled_value: Some(Dword(2)),
        },
    ]
});

/// Receive window auto-tuning levels accepted by `netsh interface tcp set global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum AutoTuningLevel {
    Disabled,
    HighlyRestricted,
    Restricted,
    #[default]
    Normal,
    Experimental,
}

/// An adapter listed by `netsh interface show interface`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub connected: bool,
    pub loopback: bool,
}

/// Network registry tweaks plus DNS and TCP auto-tuning through `netsh`.
pub struct NetworkOptimizer {
    applier: Arc<RegistryApplier>,
    runner: Arc<dyn CommandRunner>,
    elevation: Arc<dyn ElevationProbe>,
    timeout: Duration,
}

impl NetworkOptimizer {
    pub fn new(
        applier: Arc<RegistryApplier>,
        runner: Arc<dyn CommandRunner>,
        elevation: Arc<dyn ElevationProbe>,
        timeout: Duration,
    ) -> Self {
        Self {
            applier,
            runner,
            elevation,
            timeout,
        }
    }

    fn netsh(&self, args: &[&str]) -> Result<String, TweakError> {
        let output = self.runner.run("netsh", args, self.timeout)?.into_success()?;
        Ok(output.stdout)
    }

    fn require_elevation(&self, target: &str) -> Result<(), TweakError> {
        if self.elevation.is_elevated() {
            Ok(())
        } else {
            Err(TweakError::PermissionDenied {
                target: target.to_string(),
            })
        }
    }

    pub fn interfaces(&self) -> Result<Vec<NetworkInterface>, TweakError> {
        let stdout = self.netsh(&["interface", "show", "interface"])?;
        Ok(parse_interfaces(&stdout))
    }

    /// Points every connected, non-loopback interface at the given DNS servers.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)` with the names of the interfaces that were changed.
    /// - `Err(TweakError::InvalidArgument)` if either address is not IPv4; nothing is run.
    pub fn set_dns(&self, primary: &str, secondary: &str) -> Result<Vec<String>, TweakError> {
        let primary = parse_ipv4(primary)?;
        let secondary = parse_ipv4(secondary)?;
        self.require_elevation("DNS server configuration")?;

        let (primary, secondary) = (primary.to_string(), secondary.to_string());
        let mut changed = Vec::new();
        for interface in self
            .interfaces()?
            .into_iter()
            .filter(|i| i.connected && !i.loopback)
        {
            debug!("{} -> Setting DNS to {}, {}", interface.name, primary, secondary);
            self.netsh(&[
                "interface",
                "ip",
                "set",
                "dns",
                &interface.name,
                "static",
                &primary,
            ])?;
            self.netsh(&[
                "interface",
                "ip",
                "add",
                "dns",
                &interface.name,
                &secondary,
                "index=2",
            ])?;
            changed.push(interface.name);
        }

        if changed.is_empty() {
            warn!("No connected network interfaces found; DNS unchanged.");
        } else {
            info!("DNS set to {} / {} on {:?}", primary, secondary, changed);
        }
        Ok(changed)
    }

    pub fn set_auto_tuning(&self, level: AutoTuningLevel) -> Result<(), TweakError> {
        self.require_elevation("TCP auto-tuning level")?;
        let setting = format!("autotuninglevel={}", level);
        self.netsh(&["interface", "tcp", "set", "global", &setting])?;
        info!("TCP auto-tuning level set to {}", level);
        Ok(())
    }
}

impl TweakDomain for NetworkOptimizer {
    fn kind(&self) -> DomainKind {
        DomainKind::Network
    }

    fn tweaks(&self) -> &[TweakDefinition] {
        &NETWORK_TWEAKS
    }

    fn applier(&self) -> &RegistryApplier {
        &self.applier
    }
}

fn parse_ipv4(address: &str) -> Result<Ipv4Addr, TweakError> {
    address
        .trim()
        .parse()
        .map_err(|_| TweakError::InvalidArgument(format!("'{}' is not an IPv4 address", address)))
}

/// Parses the table printed by `netsh interface show interface`:
///
/// ```text
/// Admin State    State          Type             Interface Name
/// -------------------------------------------------------------------------
/// Enabled        Connected      Dedicated        Ethernet 2
/// ```
pub fn parse_interfaces(output: &str) -> Vec<NetworkInterface> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _admin = columns.next()?;
            let state = columns.next()?;
            let kind = columns.next()?;
            let name = columns.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return None;
            }
            Some(NetworkInterface {
                connected: state.eq_ignore_ascii_case("Connected"),
                loopback: kind.eq_ignore_ascii_case("Loopback")
                    || name.to_lowercase().contains("loopback"),
                name,
            })
        })
        .collect()
}
