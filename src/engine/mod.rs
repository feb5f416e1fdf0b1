//! The simulation engine as seen by the launcher.
//!
//! The engine lives in a separately built dynamic library. Everything the
//! launcher needs from it goes through the [`Engine`] trait, which is
//! implemented by [`EngineLibrary`] for the real bound library and by test
//! doubles everywhere else.
//!
//! # Threading
//!
//! The trait is `Send + Sync` because one instance is shared between the
//! foreground unit (GUI loop, exit requests) and the simulation thread (init,
//! stepping, state queries). Only the simulation thread advances the engine.

pub mod consts;
pub mod library;

pub use library::{BindError, EngineLibrary, REQUIRED_SYMBOLS, library_file_name};

use crate::models::{SimulationState, Verbosity};
use std::os::raw::c_int;

/// Engine string parameters the launcher writes before the run starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StringParam {
    StartupScript,
    ConsoleVerbosity,
    StatusbarVerbosity,
    DialogVerbosity,
    AddonScript1,
    AddonScript2,
    /// Positional application argument, zero based (`0..9`).
    AppArg(u8),
}

impl StringParam {
    /// Raw parameter identifier.
    pub fn id(self) -> c_int {
        match self {
            StringParam::StartupScript => consts::STRINGPARAM_STARTUPSCRIPTSTRING,
            StringParam::ConsoleVerbosity => consts::STRINGPARAM_VERBOSITY,
            StringParam::StatusbarVerbosity => consts::STRINGPARAM_STATUSBARVERBOSITY,
            StringParam::DialogVerbosity => consts::STRINGPARAM_DLGVERBOSITY,
            StringParam::AddonScript1 => consts::STRINGPARAM_ADDITIONAL_ADDONSCRIPT1,
            StringParam::AddonScript2 => consts::STRINGPARAM_ADDITIONAL_ADDONSCRIPT2,
            StringParam::AppArg(index) => consts::STRINGPARAM_APP_ARG1 + c_int::from(index),
        }
    }
}

/// Calls the launcher makes into the engine.
///
/// Methods returning `bool` report whether the engine accepted the call.
#[cfg_attr(test, mockall::automock)]
pub trait Engine: Send + Sync {
    /// Sets a string parameter. Only valid before the engine runs.
    fn set_string_param(&self, param: StringParam, value: &str) -> bool;

    /// Sets a named string parameter. Only valid before the engine runs.
    fn set_named_string_param(&self, key: &str, value: &str) -> bool;

    /// Loads one plugin and returns the engine's signed status handle.
    fn load_module(&self, path: &str, name: &str) -> i32;

    /// Tells the engine the system plugins have all been attempted.
    fn system_plugins_complete(&self);

    fn unload_module(&self, handle: i32) -> bool;

    /// Thread init: called on the simulation thread before the first tick.
    fn initialize(&self, app_dir: &str) -> bool;

    fn deinitialize(&self);

    fn exit_requested(&self) -> bool;

    /// Asks the engine (and with it the GUI loop) to quit.
    fn post_exit_request(&self);

    fn load_scene(&self, path: &str) -> bool;

    fn load_model(&self, path: &str) -> bool;

    fn start_simulation(&self);

    /// Not used by the launcher itself; available to custom hooks.
    fn pause_simulation(&self);

    fn stop_simulation(&self);

    fn simulation_state(&self) -> SimulationState;

    /// Simulated time in seconds.
    fn simulation_time(&self) -> f64;

    /// Advances the engine by one tick. Blocks inside the engine.
    fn step(&self);

    /// Runs the engine's GUI message loop until it decides to quit.
    fn run_gui(&self, options: i32);

    /// Exit code the engine wants the process to return, if it reports one.
    fn exit_code(&self) -> Option<i32>;

    /// Writes into the engine's own log sink.
    fn add_log(&self, source: &str, verbosity: Verbosity, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_arg_ids_are_contiguous() {
        assert_eq!(StringParam::AppArg(0).id(), consts::STRINGPARAM_APP_ARG1);
        assert_eq!(StringParam::AppArg(8).id(), consts::STRINGPARAM_APP_ARG1 + 8);
    }

    #[test]
    fn test_param_ids_are_distinct() {
        let mut ids = vec![
            StringParam::StartupScript.id(),
            StringParam::ConsoleVerbosity.id(),
            StringParam::StatusbarVerbosity.id(),
            StringParam::DialogVerbosity.id(),
            StringParam::AddonScript1.id(),
            StringParam::AddonScript2.id(),
        ];
        ids.extend((0..9).map(|i| StringParam::AppArg(i).id()));
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }
}
