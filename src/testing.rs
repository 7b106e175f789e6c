// src/testing.rs
//
// In-memory collaborators for unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::Duration,
};

use crate::{
    errors::{RegistryError, TweakError},
    tweaks::TweakDefinition,
    utils::{
        command::{CommandOutput, CommandRunner},
        registry::{RegistryLocation, RegistryStore, RegistryValue},
        services::{RunState, ServiceControl, ServiceState, StartupType},
        windows::ElevationProbe,
    },
};

fn value_id(location: &RegistryLocation, name: &str) -> String {
    location.value_path(name)
}

/// Registry held in a map keyed by canonical value path.
#[derive(Default)]
pub struct MemoryRegistry {
    values: Mutex<HashMap<String, RegistryValue>>,
    /// Value paths whose writes are accepted but silently dropped, like a policy-locked key.
    locked: Mutex<HashSet<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: Mutex<Vec<String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: &str, name: &str, value: RegistryValue) {
        let location = RegistryLocation::parse(path).unwrap();
        self.values
            .lock()
            .unwrap()
            .insert(value_id(&location, name), value);
    }

    pub fn get(&self, path: &str, name: &str) -> Option<RegistryValue> {
        let location = RegistryLocation::parse(path).unwrap();
        self.values
            .lock()
            .unwrap()
            .get(&value_id(&location, name))
            .cloned()
    }

    pub fn lock_value(&self, path: &str, name: &str) {
        let location = RegistryLocation::parse(path).unwrap();
        self.locked
            .lock()
            .unwrap()
            .insert(value_id(&location, name));
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of write calls that reached the store, including dropped ones.
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl RegistryStore for MemoryRegistry {
    fn read_value(
        &self,
        location: &RegistryLocation,
        name: &str,
    ) -> Result<Option<RegistryValue>, RegistryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RegistryError::ReadValueError(location.value_path(name)));
        }
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(&value_id(location, name))
            .cloned())
    }

    fn write_value(
        &self,
        location: &RegistryLocation,
        name: &str,
        value: &RegistryValue,
    ) -> Result<(), RegistryError> {
        let id = value_id(location, name);
        self.writes.lock().unwrap().push(id.clone());
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RegistryError::SetValueError(id));
        }
        if self.locked.lock().unwrap().contains(&id) {
            return Ok(());
        }
        self.values.lock().unwrap().insert(id, value.clone());
        Ok(())
    }

    fn delete_value(&self, location: &RegistryLocation, name: &str) -> Result<(), RegistryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RegistryError::DeleteValueError(location.value_path(name)));
        }
        self.values
            .lock()
            .unwrap()
            .remove(&value_id(location, name));
        Ok(())
    }
}

/// Service table with startup modes and run states.
#[derive(Default)]
pub struct FakeServiceControl {
    services: Mutex<HashMap<String, ServiceState>>,
    /// Services whose configuration changes are accepted but ignored.
    stuck: Mutex<HashSet<String>>,
    fail_stop: AtomicBool,
}

impl FakeServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, name: &str, startup: StartupType, run_state: RunState) {
        self.services
            .lock()
            .unwrap()
            .insert(name.to_string(), ServiceState { run_state, startup });
    }

    pub fn startup_of(&self, name: &str) -> Option<StartupType> {
        self.services
            .lock()
            .unwrap()
            .get(name)
            .map(|state| state.startup)
    }

    pub fn state_of(&self, name: &str) -> Option<ServiceState> {
        self.services.lock().unwrap().get(name).copied()
    }

    pub fn make_stuck(&self, name: &str) {
        self.stuck.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_stop(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }
}

impl ServiceControl for FakeServiceControl {
    fn query(&self, name: &str) -> Result<ServiceState, TweakError> {
        self.state_of(name)
            .ok_or_else(|| TweakError::ServiceNotFound(name.to_string()))
    }

    fn set_startup(&self, name: &str, startup: StartupType) -> Result<(), TweakError> {
        let mut services = self.services.lock().unwrap();
        let state = services
            .get_mut(name)
            .ok_or_else(|| TweakError::ServiceNotFound(name.to_string()))?;
        if !self.stuck.lock().unwrap().contains(name) {
            state.startup = startup;
        }
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<(), TweakError> {
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(TweakError::ExternalTool {
                program: "sc.exe".to_string(),
                code: Some(1062),
                output: "The service has not been started.".to_string(),
            });
        }
        let mut services = self.services.lock().unwrap();
        let state = services
            .get_mut(name)
            .ok_or_else(|| TweakError::ServiceNotFound(name.to_string()))?;
        state.run_state = RunState::Stopped;
        Ok(())
    }
}

struct Rule {
    program: String,
    pattern: String,
    code: i32,
    stdout: String,
    stderr: String,
}

/// Returns canned output for command lines matching a registered pattern.
///
/// The most recently registered matching rule wins; unmatched commands succeed with
/// empty output. Every invocation is recorded as `"<program> <args...>"`.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, program: &str, pattern: &str, code: i32, stdout: &str) {
        self.respond_full(program, pattern, code, stdout, "");
    }

    pub fn respond_full(
        &self,
        program: &str,
        pattern: &str,
        code: i32,
        stdout: &str,
        stderr: &str,
    ) {
        self.rules.lock().unwrap().push(Rule {
            program: program.to_string(),
            pattern: pattern.to_string(),
            code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<CommandOutput, TweakError> {
        let joined = args.join(" ");
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", program, joined).trim_end().to_string());

        let rules = self.rules.lock().unwrap();
        let output = match rules
            .iter()
            .rev()
            .find(|rule| rule.program == program && joined.contains(&rule.pattern))
        {
            Some(rule) => CommandOutput {
                program: program.to_string(),
                code: Some(rule.code),
                stdout: rule.stdout.clone(),
                stderr: rule.stderr.clone(),
            },
            None => CommandOutput {
                program: program.to_string(),
                code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            },
        };
        Ok(output)
    }
}

pub struct FixedElevation(pub bool);

impl ElevationProbe for FixedElevation {
    fn is_elevated(&self) -> bool {
        self.0
    }
}

/// Unique scratch directory under the system temp dir.
pub fn scratch_dir(label: &str) -> std::path::PathBuf {
    use std::sync::atomic::AtomicUsize;
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "winboost-test-{}-{}-{}",
        label,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Every id is unique, every target parses and both values share one kind.
pub fn assert_catalog_well_formed(catalog: &[TweakDefinition]) {
    let mut ids = HashSet::new();
    for tweak in catalog {
        assert!(ids.insert(tweak.id), "duplicate id {}", tweak.id);
        assert!(
            RegistryLocation::parse(tweak.path).is_ok(),
            "{} has unparsable path {}",
            tweak.id,
            tweak.path
        );
        assert!(!tweak.key.is_empty(), "{} has no value name", tweak.id);
        if let Some(disabled) = &tweak.disabled_value {
            assert_eq!(disabled.kind(), tweak.value_kind(), "{} mixes kinds", tweak.id);
        }
    }
}
