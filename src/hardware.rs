// src/hardware.rs
//
// Hardware inventory. Detection happens outside this crate; the data arrives as JSON.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    #[default]
    Unknown,
}

impl GpuVendor {
    /// Guesses the vendor from an adapter name such as "NVIDIA GeForce RTX 4070".
    pub fn detect(name: &str) -> Self {
        let upper = name.to_uppercase();
        let has = |needle: &str| upper.contains(needle);
        if has("NVIDIA") || has("GEFORCE") || has("RTX") || has("GTX") {
            GpuVendor::Nvidia
        } else if has("AMD") || has("RADEON") {
            GpuVendor::Amd
        } else if has("INTEL") || has("ARC") {
            GpuVendor::Intel
        } else {
            GpuVendor::Unknown
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuInfo {
    pub name: String,
    pub cores: u32,
    pub threads: u32,
    pub max_clock_mhz: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuInfo {
    pub name: String,
    pub driver_version: String,
    pub adapter_ram: u64,
    /// Filled from `name` when absent.
    pub vendor: Option<GpuVendor>,
}

impl GpuInfo {
    pub fn vendor(&self) -> GpuVendor {
        self.vendor.unwrap_or_else(|| GpuVendor::detect(&self.name))
    }

    pub fn ram_formatted(&self) -> String {
        if self.adapter_ram > 0 {
            format!("{} GB", self.adapter_ram / GIB)
        } else {
            "N/A".to_string()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RamInfo {
    pub total_bytes: u64,
    pub speed_mhz: u32,
    pub modules: u32,
}

impl RamInfo {
    pub fn total_formatted(&self) -> String {
        format!("{} GB", self.total_bytes / GIB)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotherboardInfo {
    pub manufacturer: String,
    pub product: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsInfo {
    pub name: String,
    pub version: String,
    pub build_number: String,
    pub architecture: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveInfo {
    pub model: String,
    pub size_bytes: u64,
    pub media_type: String,
}

/// Snapshot of the machine's hardware, as reported by an external inventory tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareInfo {
    pub cpu: CpuInfo,
    pub gpu: GpuInfo,
    pub ram: RamInfo,
    pub motherboard: MotherboardInfo,
    pub os: OsInfo,
    pub drives: Vec<DriveInfo>,
    /// Names of enabled network adapters.
    pub network_adapters: Vec<String>,
    /// Names of sound devices, first one is primary.
    pub sound_devices: Vec<String>,
}

impl HardwareInfo {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse hardware inventory JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read hardware inventory {}", path.display()))?;
        Self::from_json(&json)
    }
}
