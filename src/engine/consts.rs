//! Raw constants of the engine's C API.
//!
//! These mirror the engine's public constants header and must stay in sync
//! with the library version being bound.

use std::os::raw::c_int;

// GUI options passed to the GUI loop
pub const GUI_ALL: c_int = 0x0ffff;
pub const GUI_HEADLESS: c_int = 0x10000;

// Simulation state word
pub const SIMULATION_STOPPED: c_int = 0x00;
pub const SIMULATION_PAUSED: c_int = 0x08;
pub const SIMULATION_ADVANCING: c_int = 0x10;
pub const SIMULATION_ADVANCING_FIRSTAFTERSTOP: c_int = SIMULATION_ADVANCING;
pub const SIMULATION_ADVANCING_RUNNING: c_int = SIMULATION_ADVANCING | 0x01;
pub const SIMULATION_ADVANCING_LASTBEFOREPAUSE: c_int = SIMULATION_ADVANCING | 0x03;
pub const SIMULATION_ADVANCING_FIRSTAFTERPAUSE: c_int = SIMULATION_ADVANCING | 0x04;
pub const SIMULATION_ADVANCING_ABOUTTOSTOP: c_int = SIMULATION_ADVANCING | 0x05;
pub const SIMULATION_ADVANCING_LASTBEFORESTOP: c_int = SIMULATION_ADVANCING | 0x06;

// String parameters
pub const STRINGPARAM_APP_ARG1: c_int = 2;
pub const STRINGPARAM_ADDITIONAL_ADDONSCRIPT1: c_int = 11;
pub const STRINGPARAM_ADDITIONAL_ADDONSCRIPT2: c_int = 12;
pub const STRINGPARAM_VERBOSITY: c_int = 121;
pub const STRINGPARAM_STATUSBARVERBOSITY: c_int = 122;
pub const STRINGPARAM_DLGVERBOSITY: c_int = 123;
pub const STRINGPARAM_STARTUPSCRIPTSTRING: c_int = 125;

// Integer parameters
pub const INTPARAM_EXITCODE: c_int = 44;

// Log levels
pub const VERBOSITY_NONE: c_int = 100;
pub const VERBOSITY_ERRORS: c_int = 200;
pub const VERBOSITY_WARNINGS: c_int = 300;
pub const VERBOSITY_LOADINFOS: c_int = 400;
pub const VERBOSITY_SCRIPTERRORS: c_int = 410;
pub const VERBOSITY_SCRIPTWARNINGS: c_int = 420;
pub const VERBOSITY_SCRIPTINFOS: c_int = 430;
pub const VERBOSITY_INFOS: c_int = 450;
pub const VERBOSITY_DEBUG: c_int = 500;
pub const VERBOSITY_TRACE: c_int = 600;
pub const VERBOSITY_TRACELUA: c_int = 700;
pub const VERBOSITY_TRACEALL: c_int = 900;
