// src/tweaks/catalog.rs

use once_cell::sync::Lazy;

use super::{RiskLevel, TweakCategory, TweakDefinition};
use crate::utils::registry::RegistryValue::{Dword, String as Text};

pub(crate) const MULTIMEDIA_PROFILE: &str =
    "HKLM\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile";
const GAMES_TASK_PROFILE: &str =
    "HKLM\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile\\Tasks\\Games";

/// `NetworkThrottlingIndex` value that turns throttling off entirely.
pub const THROTTLING_OFF: u32 = 0xFFFF_FFFF;

/// General gaming and performance tweaks.
pub static GENERAL_TWEAKS: Lazy<Vec<TweakDefinition>> = Lazy::new(|| {
    vec![
        TweakDefinition {
            id: "disable_game_bar",
            name: "Disable Game Bar",
            description: "Disables the Xbox Game Bar overlay which consumes resources during gaming.",
            category: TweakCategory::Gaming,
            risk: RiskLevel::Safe,
            path: "HKCU\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\GameDVR",
            key: "AppCaptureEnabled",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "disable_game_dvr",
            name: "Disable Game DVR",
            description: "Disables background recording and Game DVR features.",
            category: TweakCategory::Gaming,
            risk: RiskLevel::Safe,
            path: "HKLM\\SOFTWARE\\Policies\\Microsoft\\Windows\\GameDVR",
            key: "AllowGameDVR",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "disable_fullscreen_optimizations",
            name: "Disable Fullscreen Optimizations",
            description: "Globally disables fullscreen optimizations that can cause input lag.",
            category: TweakCategory::Gaming,
            risk: RiskLevel::Safe,
            path: "HKCU\\System\\GameConfigStore",
            key: "GameDVR_FSEBehaviorMode",
            enabled_value: Dword(2),
            disabled_value: Some(Dword(0)),
        },
        TweakDefinition {
            id: "hardware_gpu_scheduling",
            name: "Hardware-Accelerated GPU Scheduling",
            description: "Enables HAGS to reduce latency (requires restart).",
            category: TweakCategory::Gaming,
            risk: RiskLevel::Moderate,
            path: "HKLM\\SYSTEM\\CurrentControlSet\\Control\\GraphicsDrivers",
            key: "HwSchMode",
            enabled_value: Dword(2),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "game_mode",
            name: "Enable Game Mode",
            description: "Enables Windows Game Mode for better resource allocation during gaming.",
            category: TweakCategory::Gaming,
            risk: RiskLevel::Safe,
            path: "HKCU\\SOFTWARE\\Microsoft\\GameBar",
            key: "AutoGameModeEnabled",
            enabled_value: Dword(1),
            disabled_value: Some(Dword(0)),
        },
        TweakDefinition {
            id: "disable_mouse_acceleration",
            name: "Disable Mouse Acceleration",
            description: "Disables pointer precision enhancement for consistent mouse movement.",
            category: TweakCategory::Gaming,
            risk: RiskLevel::Safe,
            path: "HKCU\\Control Panel\\Mouse",
            key: "MouseSpeed",
            enabled_value: Text("0".to_string()),
            disabled_value: Some(Text("1".to_string())),
        },
        TweakDefinition {
            id: "disable_visual_effects",
            name: "Disable Visual Effects",
            description: "Sets visual effects to best performance, freeing GPU and CPU time.",
            category: TweakCategory::Performance,
            risk: RiskLevel::Safe,
            path: "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\VisualEffects",
            key: "VisualFXSetting",
            enabled_value: Dword(2),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "disable_transparency",
            name: "Disable Transparency Effects",
            description: "Disables window transparency to improve rendering performance.",
            category: TweakCategory::Performance,
            risk: RiskLevel::Safe,
            path: "HKCU\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize",
            key: "EnableTransparency",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "disable_animations",
            name: "Disable Window Animations",
            description: "Disables minimize and maximize animations.",
            category: TweakCategory::Performance,
            risk: RiskLevel::Safe,
            path: "HKCU\\Control Panel\\Desktop\\WindowMetrics",
            key: "MinAnimate",
            enabled_value: Text("0".to_string()),
            disabled_value: Some(Text("1".to_string())),
        },
        TweakDefinition {
            id: "disable_cortana",
            name: "Disable Cortana",
            description: "Disables Cortana to free up memory and CPU usage.",
            category: TweakCategory::Performance,
            risk: RiskLevel::Safe,
            path: "HKLM\\SOFTWARE\\Policies\\Microsoft\\Windows\\Windows Search",
            key: "AllowCortana",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "disable_web_search",
            name: "Disable Web Search in Start Menu",
            description: "Disables Bing web results in Start Menu search.",
            category: TweakCategory::Performance,
            risk: RiskLevel::Safe,
            path: "HKCU\\SOFTWARE\\Policies\\Microsoft\\Windows\\Explorer",
            key: "DisableSearchBoxSuggestions",
            enabled_value: Dword(1),
            disabled_value: Some(Dword(0)),
        },
        TweakDefinition {
            id: "disable_widgets",
            name: "Disable Widgets",
            description: "Disables the Widgets panel on Windows 11.",
            category: TweakCategory::Performance,
            risk: RiskLevel::Safe,
            path: "HKLM\\SOFTWARE\\Policies\\Microsoft\\Dsh",
            key: "AllowNewsAndInterests",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(1)),
        },
        TweakDefinition {
            id: "gpu_priority",
            name: "GPU Priority for Gaming",
            description: "Raises GPU priority for foreground games.",
            category: TweakCategory::Gaming,
            risk: RiskLevel::Moderate,
            path: GAMES_TASK_PROFILE,
            key: "GPU Priority",
            enabled_value: Dword(8),
            disabled_value: Some(Dword(2)),
        },
        TweakDefinition {
            id: "cpu_priority_games",
            name: "High CPU Priority for Games",
            description: "Raises the scheduling priority of foreground games.",
            category: TweakCategory::Gaming,
            risk: RiskLevel::Moderate,
            path: GAMES_TASK_PROFILE,
            key: "Priority",
            enabled_value: Dword(6),
            disabled_value: Some(Dword(2)),
        },
        TweakDefinition {
            id: "disable_power_throttling",
            name: "Disable Power Throttling",
            description: "Prevents Windows from throttling the CPU to save power.",
            category: TweakCategory::Performance,
            risk: RiskLevel::Moderate,
            path: "HKLM\\SYSTEM\\CurrentControlSet\\Control\\Power\\PowerThrottling",
            key: "PowerThrottlingOff",
            enabled_value: Dword(1),
            disabled_value: Some(Dword(0)),
        },
        TweakDefinition {
            id: "network_throttling",
            name: "Disable Network Throttling",
            description: "Removes the 10ms network throttling delay for games and multimedia.",
            category: TweakCategory::Network,
            risk: RiskLevel::Safe,
            path: MULTIMEDIA_PROFILE,
            key: "NetworkThrottlingIndex",
            enabled_value: Dword(THROTTLING_OFF),
            disabled_value: Some(Dword(10)),
        },
        TweakDefinition {
            id: "high_timer_resolution",
            name: "High System Timer Resolution",
            description: "Honors global high timer resolution requests for smoother frame pacing.",
            category: TweakCategory::Gaming,
            risk: RiskLevel::Advanced,
            path: "HKLM\\SYSTEM\\CurrentControlSet\\Control\\Session Manager\\kernel",
            key: "GlobalTimerResolutionRequests",
            enabled_value: Dword(1),
            disabled_value: Some(Dword(0)),
        },
        TweakDefinition {
            id: "disable_prefetch",
            name: "Disable Prefetch",
            description: "Disables prefetch on SSD systems to reduce disk writes.",
            category: TweakCategory::Performance,
            risk: RiskLevel::Moderate,
            path: "HKLM\\SYSTEM\\CurrentControlSet\\Control\\Session Manager\\Memory Management\\PrefetchParameters",
            key: "EnablePrefetcher",
            enabled_value: Dword(0),
            disabled_value: Some(Dword(3)),
        },
    ]
});
