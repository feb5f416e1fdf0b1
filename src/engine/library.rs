//! Binding to the engine's dynamic library.
//!
//! [`EngineLibrary::bind`] opens the library and resolves every entry point
//! in [`REQUIRED_SYMBOLS`]. The bind is all-or-nothing: if a single symbol is
//! missing the library handle is dropped again and nothing is retained.

use super::{Engine, StringParam, consts};
use crate::models::{SimulationState, Verbosity};
use crate::platform::Platform;
use camino::{Utf8Path, Utf8PathBuf};
use libloading::Library;
use std::ffi::CString;
use std::os::raw::{c_char, c_double, c_int};
use thiserror::Error;

/// Library stem of the regular (GUI capable) engine build.
pub const ENGINE_LIBRARY: &str = "coppeliaSim";

/// Library stem of the engine build without any GUI dependency.
pub const HEADLESS_ENGINE_LIBRARY: &str = "coppeliaSimHeadless";

/// Entry points that must resolve for a bind to succeed.
pub const REQUIRED_SYMBOLS: [&str; 22] = [
    "simRunGui",
    "simInitialize",
    "simDeinitialize",
    "simGetExitRequest",
    "simPostExitRequest",
    "simLoop",
    "simAddLog",
    "simSetStringParam",
    "simSetNamedStringParam",
    "simLoadModule",
    "simUnloadModule",
    "simLoadScene",
    "simLoadModel",
    "simStartSimulation",
    "simPauseSimulation",
    "simStopSimulation",
    "simGetSimulationState",
    "simGetSimulationTime",
    "simGetInt32Param",
    "simGetStringParam",
    "simReleaseBuffer",
    "simGetLastError",
];

/// Errors from binding the engine library.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("could not find or correctly load the engine library {path}: {source}")]
    Load {
        path: Utf8PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("could not find all required functions in the engine library {path} (missing {symbol})")]
    MissingSymbol {
        path: Utf8PathBuf,
        symbol: &'static str,
    },
}

/// File name of the engine library for a platform and GUI selection.
///
/// True-headless mode selects a distinct build artifact that does not link
/// the GUI toolkit.
pub fn library_file_name(platform: Platform, true_headless: bool) -> String {
    let stem = if true_headless {
        HEADLESS_ENGINE_LIBRARY
    } else {
        ENGINE_LIBRARY
    };
    platform.decorate_library(stem)
}

type LoopCallback = Option<unsafe extern "C" fn()>;

/// Resolved entry points. Plain function pointers, valid as long as the
/// owning [`Library`] stays loaded.
struct EngineApi {
    run_gui: unsafe extern "C" fn(c_int) -> c_int,
    initialize: unsafe extern "C" fn(*const c_char, c_int) -> c_int,
    deinitialize: unsafe extern "C" fn() -> c_int,
    get_exit_request: unsafe extern "C" fn() -> c_int,
    post_exit_request: unsafe extern "C" fn() -> c_int,
    sim_loop: unsafe extern "C" fn(LoopCallback, c_int) -> c_int,
    add_log: unsafe extern "C" fn(*const c_char, c_int, *const c_char) -> c_int,
    set_string_param: unsafe extern "C" fn(c_int, *const c_char) -> c_int,
    set_named_string_param: unsafe extern "C" fn(*const c_char, *const c_char, c_int) -> c_int,
    load_module: unsafe extern "C" fn(*const c_char, *const c_char) -> c_int,
    unload_module: unsafe extern "C" fn(c_int) -> c_int,
    load_scene: unsafe extern "C" fn(*const c_char) -> c_int,
    load_model: unsafe extern "C" fn(*const c_char) -> c_int,
    start_simulation: unsafe extern "C" fn() -> c_int,
    pause_simulation: unsafe extern "C" fn() -> c_int,
    stop_simulation: unsafe extern "C" fn() -> c_int,
    get_simulation_state: unsafe extern "C" fn() -> c_int,
    get_simulation_time: unsafe extern "C" fn() -> c_double,
    get_int32_param: unsafe extern "C" fn(c_int, *mut c_int) -> c_int,
}

impl EngineApi {
    /// Resolves every required symbol or fails with the first missing one.
    ///
    /// # Safety
    /// The declared signatures must match the library's exports.
    unsafe fn resolve(library: &Library, path: &Utf8Path) -> Result<Self, BindError> {
        // Every listed symbol must exist, including ones not called from here.
        for symbol in REQUIRED_SYMBOLS {
            let _: unsafe extern "C" fn() = unsafe { lookup(library, path, symbol)? };
        }

        unsafe {
            Ok(Self {
                run_gui: lookup(library, path, "simRunGui")?,
                initialize: lookup(library, path, "simInitialize")?,
                deinitialize: lookup(library, path, "simDeinitialize")?,
                get_exit_request: lookup(library, path, "simGetExitRequest")?,
                post_exit_request: lookup(library, path, "simPostExitRequest")?,
                sim_loop: lookup(library, path, "simLoop")?,
                add_log: lookup(library, path, "simAddLog")?,
                set_string_param: lookup(library, path, "simSetStringParam")?,
                set_named_string_param: lookup(library, path, "simSetNamedStringParam")?,
                load_module: lookup(library, path, "simLoadModule")?,
                unload_module: lookup(library, path, "simUnloadModule")?,
                load_scene: lookup(library, path, "simLoadScene")?,
                load_model: lookup(library, path, "simLoadModel")?,
                start_simulation: lookup(library, path, "simStartSimulation")?,
                pause_simulation: lookup(library, path, "simPauseSimulation")?,
                stop_simulation: lookup(library, path, "simStopSimulation")?,
                get_simulation_state: lookup(library, path, "simGetSimulationState")?,
                get_simulation_time: lookup(library, path, "simGetSimulationTime")?,
                get_int32_param: lookup(library, path, "simGetInt32Param")?,
            })
        }
    }
}

/// Looks up one symbol and copies the function pointer out of it.
unsafe fn lookup<T: Copy>(
    library: &Library,
    path: &Utf8Path,
    symbol: &'static str,
) -> Result<T, BindError> {
    let resolved = unsafe { library.get::<T>(symbol.as_bytes()) };
    resolved
        .map(|sym| *sym)
        .map_err(|_| BindError::MissingSymbol {
            path: path.to_path_buf(),
            symbol,
        })
}

/// Converts a Rust string for the C API, rejecting interior NULs.
fn c_string(value: &str) -> Option<CString> {
    match CString::new(value) {
        Ok(s) => Some(s),
        Err(_) => {
            tracing::warn!("Refusing to pass a string with an interior NUL to the engine");
            None
        }
    }
}

/// The engine, bound from its dynamic library.
///
/// Dropping the value unloads the library, so it must outlive every thread
/// that calls into it. The launcher keeps it in an `Arc` and joins the
/// simulation thread before the last reference goes away.
pub struct EngineLibrary {
    api: EngineApi,
    path: Utf8PathBuf,
    // Declared last: dropped after `api`, whose pointers point into it.
    _library: Library,
}

impl EngineLibrary {
    /// Opens the library at `path` and resolves all required entry points.
    pub fn bind(path: &Utf8Path) -> Result<Self, BindError> {
        tracing::info!("Loading the engine library {}", path);

        let library = unsafe { Library::new(path.as_std_path()) }.map_err(|source| {
            BindError::Load {
                path: path.to_path_buf(),
                source,
            }
        })?;

        // On failure `library` is dropped here, unloading it again.
        let api = unsafe { EngineApi::resolve(&library, path)? };

        tracing::info!("Engine library bound ({} entry points)", REQUIRED_SYMBOLS.len());
        Ok(Self {
            api,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for EngineLibrary {
    fn drop(&mut self) {
        tracing::info!("Unloading the engine library {}", self.path);
    }
}

// SAFETY: the engine API is designed to be called from its GUI thread and its
// simulation thread concurrently; the struct only holds function pointers and
// the library handle.
unsafe impl Send for EngineLibrary {}
unsafe impl Sync for EngineLibrary {}

impl Engine for EngineLibrary {
    fn set_string_param(&self, param: StringParam, value: &str) -> bool {
        let Some(value) = c_string(value) else {
            return false;
        };
        unsafe { (self.api.set_string_param)(param.id(), value.as_ptr()) != -1 }
    }

    fn set_named_string_param(&self, key: &str, value: &str) -> bool {
        let (Some(c_key), Some(c_value)) = (c_string(key), c_string(value)) else {
            return false;
        };
        let Ok(len) = c_int::try_from(value.len()) else {
            return false;
        };
        unsafe { (self.api.set_named_string_param)(c_key.as_ptr(), c_value.as_ptr(), len) != -1 }
    }

    fn load_module(&self, path: &str, name: &str) -> i32 {
        let (Some(c_path), Some(c_name)) = (c_string(path), c_string(name)) else {
            return -3;
        };
        unsafe { (self.api.load_module)(c_path.as_ptr(), c_name.as_ptr()) }
    }

    fn system_plugins_complete(&self) {
        // The engine treats a load call with empty path and name as the
        // end-of-system-plugins marker.
        let empty = c"";
        unsafe {
            (self.api.load_module)(empty.as_ptr(), empty.as_ptr());
        }
    }

    fn unload_module(&self, handle: i32) -> bool {
        unsafe { (self.api.unload_module)(handle) != -1 }
    }

    fn initialize(&self, app_dir: &str) -> bool {
        let Some(dir) = c_string(app_dir) else {
            return false;
        };
        unsafe { (self.api.initialize)(dir.as_ptr(), 0) != -1 }
    }

    fn deinitialize(&self) {
        unsafe {
            (self.api.deinitialize)();
        }
    }

    fn exit_requested(&self) -> bool {
        unsafe { (self.api.get_exit_request)() > 0 }
    }

    fn post_exit_request(&self) {
        unsafe {
            (self.api.post_exit_request)();
        }
    }

    fn load_scene(&self, path: &str) -> bool {
        let Some(path) = c_string(path) else {
            return false;
        };
        unsafe { (self.api.load_scene)(path.as_ptr()) != -1 }
    }

    fn load_model(&self, path: &str) -> bool {
        let Some(path) = c_string(path) else {
            return false;
        };
        unsafe { (self.api.load_model)(path.as_ptr()) != -1 }
    }

    fn start_simulation(&self) {
        unsafe {
            (self.api.start_simulation)();
        }
    }

    fn pause_simulation(&self) {
        unsafe {
            (self.api.pause_simulation)();
        }
    }

    fn stop_simulation(&self) {
        unsafe {
            (self.api.stop_simulation)();
        }
    }

    fn simulation_state(&self) -> SimulationState {
        SimulationState::from_raw(unsafe { (self.api.get_simulation_state)() })
    }

    fn simulation_time(&self) -> f64 {
        unsafe { (self.api.get_simulation_time)() }
    }

    fn step(&self) {
        unsafe {
            (self.api.sim_loop)(None, 0);
        }
    }

    fn run_gui(&self, options: i32) {
        unsafe {
            (self.api.run_gui)(options);
        }
    }

    fn exit_code(&self) -> Option<i32> {
        let mut value: c_int = 0;
        let result = unsafe { (self.api.get_int32_param)(consts::INTPARAM_EXITCODE, &mut value) };
        (result > 0).then_some(value)
    }

    fn add_log(&self, source: &str, verbosity: Verbosity, message: &str) {
        let (Some(source), Some(message)) = (c_string(source), c_string(message)) else {
            return;
        };
        unsafe {
            (self.api.add_log)(source.as_ptr(), verbosity.level(), message.as_ptr());
        }
    }
}
