//! Scripted in-process engine shared by the integration tests.
//!
//! `FakeEngine` records every call and emulates just enough of the engine's
//! simulation state machine for the launcher's automation: start, step,
//! stop, simulated time and the exit request.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use simclient::engine::StringParam;
use simclient::models::{SimulationState, Verbosity};
use simclient::platform::Platform;
use simclient::Engine;
use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Simulated seconds per step.
pub const STEP_SECONDS: f64 = 0.05;

/// Steps after which the fake raises its own exit request, so a broken test
/// fails instead of hanging.
pub const MAX_STEPS: u64 = 10_000;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    SetString(StringParam, String),
    SetNamed(String, String),
    LoadModule(String),
    SystemPluginsComplete,
    UnloadModule(i32),
    Initialize,
    Deinitialize,
    PostExit,
    LoadScene(String),
    LoadModel(String),
    Start,
    Pause,
    Stop,
    RunGui(i32),
    Log(Verbosity, String),
}

#[derive(Debug)]
struct Sim {
    state: SimulationState,
    time: f64,
    stopping: bool,
}

pub struct FakeEngine {
    calls: Mutex<Vec<Call>>,
    sim: Mutex<Sim>,
    exit: AtomicBool,
    steps: AtomicU64,
    plugin_results: HashMap<String, i32>,
    next_handle: Mutex<i32>,
    scene_loads_succeed: bool,
    exit_code: Option<i32>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            sim: Mutex::new(Sim {
                state: SimulationState::Stopped,
                time: 0.0,
                stopping: false,
            }),
            exit: AtomicBool::new(false),
            steps: AtomicU64::new(0),
            plugin_results: HashMap::new(),
            next_handle: Mutex::new(0),
            scene_loads_succeed: true,
            exit_code: None,
        }
    }

    /// Make `load_module` return `code` for the named plugin.
    pub fn with_plugin_result(mut self, name: &str, code: i32) -> Self {
        self.plugin_results.insert(name.to_string(), code);
        self
    }

    pub fn with_failing_scene_loads(mut self) -> Self {
        self.scene_loads_succeed = false;
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::SeqCst)
    }

    /// Names passed to `load_module`, in call order.
    pub fn module_loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::LoadModule(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn string_params(&self) -> Vec<(StringParam, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SetString(param, value) => Some((param, value)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Engine for FakeEngine {
    fn set_string_param(&self, param: StringParam, value: &str) -> bool {
        self.record(Call::SetString(param, value.to_string()));
        true
    }

    fn set_named_string_param(&self, key: &str, value: &str) -> bool {
        self.record(Call::SetNamed(key.to_string(), value.to_string()));
        true
    }

    fn load_module(&self, _path: &str, name: &str) -> i32 {
        self.record(Call::LoadModule(name.to_string()));
        if let Some(code) = self.plugin_results.get(name) {
            return *code;
        }
        let mut handle = self.next_handle.lock().unwrap();
        *handle += 1;
        *handle
    }

    fn system_plugins_complete(&self) {
        self.record(Call::SystemPluginsComplete);
    }

    fn unload_module(&self, handle: i32) -> bool {
        self.record(Call::UnloadModule(handle));
        true
    }

    fn initialize(&self, _app_dir: &str) -> bool {
        self.record(Call::Initialize);
        true
    }

    fn deinitialize(&self) {
        self.record(Call::Deinitialize);
    }

    fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }

    fn post_exit_request(&self) {
        self.record(Call::PostExit);
        self.exit.store(true, Ordering::SeqCst);
    }

    fn load_scene(&self, path: &str) -> bool {
        self.record(Call::LoadScene(path.to_string()));
        self.scene_loads_succeed
    }

    fn load_model(&self, path: &str) -> bool {
        self.record(Call::LoadModel(path.to_string()));
        self.scene_loads_succeed
    }

    fn start_simulation(&self) {
        self.record(Call::Start);
        let mut sim = self.sim.lock().unwrap();
        if sim.state == SimulationState::Stopped {
            sim.state = SimulationState::AdvancingFirstAfterStop;
            sim.time = 0.0;
            sim.stopping = false;
        }
    }

    fn pause_simulation(&self) {
        self.record(Call::Pause);
    }

    fn stop_simulation(&self) {
        self.record(Call::Stop);
        self.sim.lock().unwrap().stopping = true;
    }

    fn simulation_state(&self) -> SimulationState {
        self.sim.lock().unwrap().state
    }

    fn simulation_time(&self) -> f64 {
        self.sim.lock().unwrap().time
    }

    fn step(&self) {
        let steps = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut sim = self.sim.lock().unwrap();
            let stopping = sim.stopping;
            sim.state = match sim.state {
                SimulationState::AdvancingLastBeforeStop => SimulationState::Stopped,
                state if state.is_advancing() && stopping => {
                    SimulationState::AdvancingLastBeforeStop
                }
                state if state.is_advancing() => SimulationState::AdvancingRunning,
                state => state,
            };
            if sim.state.is_advancing() {
                sim.time += STEP_SECONDS;
            }
        }
        if steps >= MAX_STEPS {
            self.exit.store(true, Ordering::SeqCst);
        }
    }

    fn run_gui(&self, options: i32) {
        self.record(Call::RunGui(options));
        while !self.exit.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    fn add_log(&self, _source: &str, verbosity: Verbosity, message: &str) {
        self.record(Call::Log(verbosity, message.to_string()));
    }
}

/// Temporary application directory as a UTF-8 path.
pub fn temp_app_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, path)
}

/// Creates an empty plugin file for `name` following the host naming pattern.
pub fn touch_plugin(dir: &Utf8Path, name: &str) -> Utf8PathBuf {
    let file_name = Platform::current().decorate_library(&format!("simExt{}", name));
    let path = dir.join(file_name);
    fs::write(&path, b"").unwrap();
    path
}

/// Builds an argument vector with the program name in front.
pub fn argv(args: &[&str]) -> Vec<std::ffi::OsString> {
    std::iter::once("simclient")
        .chain(args.iter().copied())
        .map(std::ffi::OsString::from)
        .collect()
}
