// src/power.rs

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    constants::{BALANCED_GUID, HIGH_PERFORMANCE_GUID, POWER_SAVER_GUID, ULTIMATE_PERFORMANCE_GUID},
    errors::TweakError,
    utils::{command::CommandRunner, windows::ElevationProbe},
};

/// Display names of the built-in schemes, used when `powercfg` prints no name.
const KNOWN_PLANS: [(&str, &str); 4] = [
    (BALANCED_GUID, "Balanced"),
    (HIGH_PERFORMANCE_GUID, "High performance"),
    (POWER_SAVER_GUID, "Power saver"),
    (ULTIMATE_PERFORMANCE_GUID, "Ultimate Performance"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerPlan {
    pub guid: String,
    pub name: String,
    pub active: bool,
}

pub fn known_plan_name(guid: &str) -> Option<&'static str> {
    KNOWN_PLANS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(guid))
        .map(|(_, name)| *name)
}

/// Power scheme management through `powercfg`.
pub struct PowerPlanService {
    runner: Arc<dyn CommandRunner>,
    elevation: Arc<dyn ElevationProbe>,
    timeout: Duration,
}

impl PowerPlanService {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        elevation: Arc<dyn ElevationProbe>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            elevation,
            timeout,
        }
    }

    fn powercfg(&self, args: &[&str]) -> Result<String, TweakError> {
        let output = self
            .runner
            .run("powercfg", args, self.timeout)?
            .into_success()?;
        Ok(output.stdout)
    }

    pub fn current_plan(&self) -> Result<PowerPlan, TweakError> {
        let stdout = self.powercfg(&["/getactivescheme"])?;
        let line = stdout
            .lines()
            .find(|line| line.contains("GUID"))
            .ok_or_else(|| TweakError::ExternalTool {
                program: "powercfg".to_string(),
                code: Some(0),
                output: format!("no active scheme in output: {}", stdout.trim()),
            })?;
        let mut plan = parse_plan_line(line).ok_or_else(|| TweakError::ExternalTool {
            program: "powercfg".to_string(),
            code: Some(0),
            output: format!("unrecognized scheme line: {}", line.trim()),
        })?;
        plan.active = true;
        Ok(plan)
    }

    pub fn all_plans(&self) -> Result<Vec<PowerPlan>, TweakError> {
        let stdout = self.powercfg(&["/list"])?;
        Ok(stdout
            .lines()
            .filter(|line| line.contains("GUID"))
            .filter_map(parse_plan_line)
            .collect())
    }

    pub fn is_ultimate_available(&self) -> Result<bool, TweakError> {
        Ok(self.find_ultimate()?.is_some())
    }

    fn find_ultimate(&self) -> Result<Option<PowerPlan>, TweakError> {
        Ok(self.all_plans()?.into_iter().find(|plan| {
            plan.guid.eq_ignore_ascii_case(ULTIMATE_PERFORMANCE_GUID)
                || plan.name.eq_ignore_ascii_case("Ultimate Performance")
        }))
    }

    /// Activates Ultimate Performance, creating it from the hidden template first if
    /// no such scheme exists yet.
    ///
    /// # Returns
    ///
    /// - `Ok(String)` with the GUID of the scheme that is now active.
    pub fn enable_ultimate_performance(&self) -> Result<String, TweakError> {
        let guid = match self.find_ultimate()? {
            Some(plan) => plan.guid,
            None => {
                debug!("Ultimate Performance not present, duplicating template scheme.");
                let stdout = self.powercfg(&["-duplicatescheme", ULTIMATE_PERFORMANCE_GUID])?;
                stdout
                    .lines()
                    .find_map(parse_plan_line)
                    .map(|plan| plan.guid)
                    .unwrap_or_else(|| ULTIMATE_PERFORMANCE_GUID.to_string())
            }
        };
        self.set_plan(&guid)?;
        Ok(guid)
    }

    /// Activates a scheme and confirms it is reported as active afterwards.
    pub fn set_plan(&self, guid: &str) -> Result<(), TweakError> {
        if !is_guid(guid) {
            return Err(TweakError::InvalidArgument(format!(
                "'{}' is not a power scheme GUID",
                guid
            )));
        }
        self.powercfg(&["/setactive", guid])?;

        let active = self.current_plan()?;
        if !active.guid.eq_ignore_ascii_case(guid) {
            return Err(TweakError::WriteVerification {
                target: "active power scheme".to_string(),
                expected: guid.to_string(),
                found: active.guid,
            });
        }
        info!("Power plan set to {} ({})", active.name, active.guid);
        Ok(())
    }

    pub fn set_high_performance(&self) -> Result<(), TweakError> {
        self.set_plan(HIGH_PERFORMANCE_GUID)
    }

    pub fn set_hibernation(&self, enabled: bool) -> Result<(), TweakError> {
        if !self.elevation.is_elevated() {
            return Err(TweakError::PermissionDenied {
                target: "hibernation".to_string(),
            });
        }
        self.powercfg(&["/hibernate", if enabled { "on" } else { "off" }])?;
        info!("Hibernation {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }
}

/// Parses `Power Scheme GUID: 381b4222-f694-41f0-9685-ff5bb260df2e  (Balanced) *`.
pub fn parse_plan_line(line: &str) -> Option<PowerPlan> {
    let (_, rest) = line.split_once(':')?;
    let rest = rest.trim();
    let guid = rest.split_whitespace().next()?;
    if !is_guid(guid) {
        return None;
    }

    let printed_name = match (rest.find('('), rest.rfind(')')) {
        (Some(start), Some(end)) if end > start => Some(rest[start + 1..end].trim()),
        _ => None,
    };
    let name = printed_name
        .filter(|name| !name.is_empty())
        .or_else(|| known_plan_name(guid))
        .unwrap_or("Unknown");

    Some(PowerPlan {
        guid: guid.to_lowercase(),
        name: name.to_string(),
        active: rest.ends_with('*'),
    })
}

/// `8-4-4-4-12` hexadecimal groups.
fn is_guid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedElevation, ScriptedRunner};

    const LIST: &str = "\r\nExisting Power Schemes (* Active)\r\n-----------------------------------\r\nPower Scheme GUID: 381b4222-f694-41f0-9685-ff5bb260df2e  (Balanced) *\r\nPower Scheme GUID: 8c5e7fda-e8bf-4a96-9a85-a6e23a8c635c  (High performance)\r\nPower Scheme GUID: a1841308-3541-4fab-bc81-f71556f20b4a\r\n";

    fn service(elevated: bool) -> (Arc<ScriptedRunner>, PowerPlanService) {
        let runner = Arc::new(ScriptedRunner::new());
        let power = PowerPlanService::new(
            runner.clone(),
            Arc::new(FixedElevation(elevated)),
            Duration::from_secs(5),
        );
        (runner, power)
    }

    fn active(guid: &str, name: &str) -> String {
        format!("Power Scheme GUID: {}  ({})", guid, name)
    }

    #[test]
    fn test_parse_plan_lines() {
        let plan = parse_plan_line(
            "Power Scheme GUID: 381b4222-f694-41f0-9685-ff5bb260df2e  (Balanced) *",
        )
        .unwrap();
        assert_eq!(plan.guid, BALANCED_GUID);
        assert_eq!(plan.name, "Balanced");
        assert!(plan.active);

        let unnamed =
            parse_plan_line("Power Scheme GUID: a1841308-3541-4fab-bc81-f71556f20b4a").unwrap();
        assert_eq!(unnamed.name, "Power saver");
        assert!(!unnamed.active);

        let custom = parse_plan_line("GUID: 11111111-2222-3333-4444-555555555555").unwrap();
        assert_eq!(custom.name, "Unknown");

        assert!(parse_plan_line("Existing Power Schemes (* Active)").is_none());
    }

    #[test]
    fn test_all_plans_and_ultimate_availability() {
        let (runner, power) = service(false);
        runner.respond("powercfg", "/list", 0, LIST);

        let plans = power.all_plans().unwrap();
        assert_eq!(plans.len(), 3);
        assert!(plans[0].active);
        assert!(!power.is_ultimate_available().unwrap());
    }

    #[test]
    fn test_set_plan_verifies_active_scheme() {
        let (runner, power) = service(false);
        runner.respond(
            "powercfg",
            "/getactivescheme",
            0,
            &active(HIGH_PERFORMANCE_GUID, "High performance"),
        );
        power.set_high_performance().unwrap();
        assert!(runner
            .calls()
            .contains(&format!("powercfg /setactive {}", HIGH_PERFORMANCE_GUID)));
    }

    #[test]
    fn test_set_plan_that_does_not_stick() {
        let (runner, power) = service(false);
        runner.respond(
            "powercfg",
            "/getactivescheme",
            0,
            &active(BALANCED_GUID, "Balanced"),
        );
        match power.set_plan(POWER_SAVER_GUID) {
            Err(TweakError::WriteVerification { expected, found, .. }) => {
                assert_eq!(expected, POWER_SAVER_GUID);
                assert_eq!(found, BALANCED_GUID);
            }
            other => panic!("expected verification failure, got {:?}", other),
        }
    }

    #[test]
    fn test_set_plan_rejects_non_guid() {
        let (runner, power) = service(true);
        assert!(matches!(
            power.set_plan("scheme_min; del"),
            Err(TweakError::InvalidArgument(_))
        ));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_enable_ultimate_duplicates_when_missing() {
        let (runner, power) = service(false);
        let copy = "0c2c5f1e-7c4b-4a3d-9b1e-1d2e3f405060";
        runner.respond("powercfg", "/list", 0, LIST);
        runner.respond(
            "powercfg",
            "-duplicatescheme",
            0,
            &active(copy, "Ultimate Performance"),
        );
        runner.respond(
            "powercfg",
            "/getactivescheme",
            0,
            &active(copy, "Ultimate Performance"),
        );

        assert_eq!(power.enable_ultimate_performance().unwrap(), copy);
        assert!(runner
            .calls()
            .contains(&format!("powercfg /setactive {}", copy)));
    }

    #[test]
    fn test_enable_ultimate_reuses_existing_scheme() {
        let (runner, power) = service(false);
        let list = format!(
            "{}{}\r\n",
            LIST,
            active(ULTIMATE_PERFORMANCE_GUID, "Ultimate Performance")
        );
        runner.respond("powercfg", "/list", 0, &list);
        runner.respond(
            "powercfg",
            "/getactivescheme",
            0,
            &active(ULTIMATE_PERFORMANCE_GUID, "Ultimate Performance"),
        );

        power.enable_ultimate_performance().unwrap();
        assert!(!runner.calls().iter().any(|c| c.contains("-duplicatescheme")));
    }

    #[test]
    fn test_hibernation_needs_elevation() {
        let (runner, power) = service(false);
        assert!(power.set_hibernation(false).unwrap_err().is_permission());
        assert!(runner.calls().is_empty());

        let (runner, power) = service(true);
        power.set_hibernation(false).unwrap();
        assert_eq!(runner.calls(), vec!["powercfg /hibernate off".to_string()]);
    }
}
