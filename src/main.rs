//! simclient - launcher for the simulation engine
//!
//! Main entry point.
//!
//! # Execution Flow
//!
//! 1. `-X PROGRAM [ARGS...]` as the first argument replaces the process (Unix)
//! 2. Parse the command line; errors print usage and exit with 2
//! 3. Load launcher settings (`simclient.yaml`, written with defaults when
//!    missing, then `SIMCLIENT_*`)
//! 4. Initialize logging → `<log_dir>/simclient.<date>` plus the console
//! 5. Bind the engine library (exit 255 on failure), push parameters, load
//!    plugins and run the engine until it exits
//! 6. Exit with the engine-reported exit code, or 0
//!
//! # Threads
//!
//! - **Main thread**: the engine's GUI loop (or, in true-headless mode, the
//!   simulation loop itself)
//! - **simclient-sim**: engine initialization, plugin loading and stepping

use simclient::cli;
use simclient::logging::{self, LoggingOptions};
use simclient::{APP_NAME, ConfigManager, Launcher, LauncherSettings, VERSION};
use std::ffi::OsString;
use std::process::ExitCode;

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from((code & 0xff) as u8)
}

fn main() -> ExitCode {
    let argv: Vec<OsString> = std::env::args_os().collect();

    if let Some(request) = cli::exec_request(&argv) {
        let err = cli::exec(&request);
        err.print();
        return exit_code(err.exit_code());
    }

    let options = match cli::parse_args(&argv) {
        Ok(options) => options,
        Err(err) => {
            err.print();
            return exit_code(err.exit_code());
        }
    };

    let app_dir = match simclient::launcher::application_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Warning: {:#}; using the current directory", e);
            ".".into()
        }
    };

    let config_manager = ConfigManager::new(&app_dir);
    // Logging is not up yet, so problems go to stderr.
    if let Err(e) = config_manager.ensure_settings_file() {
        eprintln!("Warning: {:#}", e);
    }
    let settings = match config_manager.load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Warning: {:#}; using default launcher settings", e);
            LauncherSettings::default()
        }
    };

    let mut log_options = LoggingOptions {
        log_dir: config_manager.resolve(&settings.log_dir),
        log_prefix: settings.log_prefix.clone(),
        file: settings.file_log,
        console: settings.console_log.then_some(options.console_verbosity),
        debug: settings.debug,
    };
    // Held until exit so the file log is flushed.
    let _log_guard = match logging::setup_logging(&log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: {:#}; continuing without a log file", e);
            log_options.file = false;
            logging::setup_logging(&log_options).ok().flatten()
        }
    };

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let launcher = Launcher::new(settings, app_dir);
    match launcher.launch(&options) {
        Ok(outcome) => exit_code(outcome.exit_code),
        Err(e) => {
            tracing::error!("Launch failed: {}", e);
            exit_code(e.exit_code())
        }
    }
}
