// src/drivers.rs

use serde::Serialize;
use strum_macros::Display;

use crate::hardware::{GpuInfo, GpuVendor, HardwareInfo, MotherboardInfo};

const NVIDIA_DRIVERS: &str = "https://www.nvidia.com/Download/index.aspx";
const AMD_DRIVERS: &str = "https://www.amd.com/en/support";
const INTEL_DRIVERS: &str = "https://www.intel.com/content/www/us/en/download-center/home.html";
const REALTEK_DRIVERS: &str = "https://www.realtek.com/en/downloads";

/// Board vendors matched by substring of the upper-cased manufacturer.
const CHIPSET_VENDORS: [(&[&str], &str, &str); 4] = [
    (&["ASUS", "ASUSTEK"], "ASUS", "https://www.asus.com/support/download-center/"),
    (&["MSI", "MICRO-STAR"], "MSI", "https://www.msi.com/support/download"),
    (&["GIGABYTE"], "Gigabyte", "https://www.gigabyte.com/Support"),
    (&["ASROCK"], "ASRock", "https://www.asrock.com/support/index.asp"),
];

const NETWORK_VENDORS: [(&[&str], &str, &str); 3] = [
    (&["REALTEK"], "Realtek", REALTEK_DRIVERS),
    (&["INTEL"], "Intel", INTEL_DRIVERS),
    (&["KILLER", "QUALCOMM"], "Killer/Intel", INTEL_DRIVERS),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum DriverCategory {
    #[strum(serialize = "GPU")]
    Gpu,
    Chipset,
    Network,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverRecommendation {
    pub category: DriverCategory,
    pub device_name: String,
    pub vendor: String,
    pub current_version: Option<String>,
    /// Empty when the vendor is not recognized.
    pub download_url: String,
    pub description: String,
}

fn lookup<'a>(
    table: &'a [(&[&str], &'a str, &'a str)],
    name: &str,
) -> Option<(&'a str, &'a str)> {
    let upper = name.to_uppercase();
    table
        .iter()
        .find(|(needles, _, _)| needles.iter().any(|needle| upper.contains(needle)))
        .map(|(_, vendor, url)| (*vendor, *url))
}

/// Maps hardware inventory to vendor driver download pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct DriverService;

impl DriverService {
    pub fn recommendations(&self, info: &HardwareInfo) -> Vec<DriverRecommendation> {
        let mut recommendations = vec![gpu_driver(&info.gpu), chipset_driver(&info.motherboard)];
        recommendations.extend(
            info.network_adapters
                .iter()
                .filter_map(|name| network_driver(name)),
        );
        recommendations.push(audio_driver(&info.sound_devices));
        recommendations
    }
}

fn gpu_driver(gpu: &GpuInfo) -> DriverRecommendation {
    let (vendor, url, description) = match gpu.vendor() {
        GpuVendor::Nvidia => (
            "NVIDIA",
            NVIDIA_DRIVERS,
            "Download the latest NVIDIA Game Ready or Studio driver".to_string(),
        ),
        GpuVendor::Amd => (
            "AMD",
            AMD_DRIVERS,
            "Download the latest AMD Adrenalin driver".to_string(),
        ),
        GpuVendor::Intel => (
            "Intel",
            INTEL_DRIVERS,
            "Download the latest Intel Graphics driver".to_string(),
        ),
        GpuVendor::Unknown => ("Unknown", "", "GPU vendor not recognized".to_string()),
    };
    DriverRecommendation {
        category: DriverCategory::Gpu,
        device_name: gpu.name.clone(),
        vendor: vendor.to_string(),
        current_version: Some(gpu.driver_version.clone()).filter(|v| !v.is_empty()),
        download_url: url.to_string(),
        description,
    }
}

fn chipset_driver(board: &MotherboardInfo) -> DriverRecommendation {
    // Unknown boards fall back to Intel's download center.
    let (vendor, url) = lookup(&CHIPSET_VENDORS, &board.manufacturer)
        .unwrap_or((board.manufacturer.as_str(), INTEL_DRIVERS));
    DriverRecommendation {
        category: DriverCategory::Chipset,
        device_name: format!("{} {}", board.manufacturer, board.product)
            .trim()
            .to_string(),
        vendor: vendor.to_string(),
        current_version: None,
        download_url: url.to_string(),
        description: format!("Download chipset drivers from the {} support page", vendor),
    }
}

fn network_driver(adapter: &str) -> Option<DriverRecommendation> {
    if adapter.trim().is_empty() {
        return None;
    }
    let (vendor, url) = lookup(&NETWORK_VENDORS, adapter)?;
    Some(DriverRecommendation {
        category: DriverCategory::Network,
        device_name: adapter.to_string(),
        vendor: vendor.to_string(),
        current_version: None,
        download_url: url.to_string(),
        description: format!("Download the latest {} network driver", vendor),
    })
}

fn audio_driver(sound_devices: &[String]) -> DriverRecommendation {
    let device = sound_devices.iter().find(|name| !name.trim().is_empty());
    let upper = device.map(|name| name.to_uppercase()).unwrap_or_default();
    let (vendor, url) = if upper.contains("NVIDIA") {
        ("NVIDIA", NVIDIA_DRIVERS)
    } else if upper.contains("AMD") {
        ("AMD", AMD_DRIVERS)
    } else {
        ("Realtek", REALTEK_DRIVERS)
    };
    DriverRecommendation {
        category: DriverCategory::Audio,
        device_name: device
            .cloned()
            .unwrap_or_else(|| "Audio Device".to_string()),
        vendor: vendor.to_string(),
        current_version: None,
        download_url: url.to_string(),
        description: format!("Download the latest {} audio driver", vendor),
    }
}
