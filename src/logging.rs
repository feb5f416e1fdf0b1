use crate::models::Verbosity;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// What the launcher logs and where.
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Directory for the daily rotating log file
    pub log_dir: Utf8PathBuf,
    pub log_prefix: String,
    /// Write the log file at all
    pub file: bool,
    /// Console verbosity, or `None` for no console output
    pub console: Option<Verbosity>,
    /// Force debug level on every layer
    pub debug: bool,
}

/// Console level for an engine verbosity name.
pub fn console_filter_for(verbosity: Verbosity) -> LevelFilter {
    match verbosity {
        Verbosity::None => LevelFilter::OFF,
        Verbosity::Errors => LevelFilter::ERROR,
        Verbosity::Warnings => LevelFilter::WARN,
        Verbosity::LoadInfos
        | Verbosity::ScriptErrors
        | Verbosity::ScriptWarnings
        | Verbosity::ScriptInfos
        | Verbosity::Infos => LevelFilter::INFO,
        Verbosity::Debug => LevelFilter::DEBUG,
        Verbosity::Trace | Verbosity::TraceLua | Verbosity::TraceAll => LevelFilter::TRACE,
    }
}

/// Create the log directory if it doesn't exist.
fn ensure_log_dir(log_dir: &Utf8Path) -> Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(())
}

/// Setup logging with a rotating file appender and an optional console layer.
///
/// The file layer honors `RUST_LOG` and otherwise logs at info (debug when
/// `debug` is set). The console layer follows the `-v` verbosity.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep the file
/// log flushing. `None` when file logging is disabled.
///
/// # Errors
/// Fails if the log directory cannot be created or a global subscriber is
/// already installed.
pub fn setup_logging(options: &LoggingOptions) -> Result<Option<WorkerGuard>> {
    let default_level = if options.debug { "debug" } else { "info" };

    let (file_layer, guard) = if options.file {
        ensure_log_dir(&options.log_dir)?;
        let file_appender = rolling::daily(&options.log_dir, &options.log_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false) // No ANSI codes in log files
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let console_layer = options.console.map(|verbosity| {
        let level = if options.debug {
            LevelFilter::DEBUG.max(console_filter_for(verbosity))
        } else {
            console_filter_for(verbosity)
        };
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .with_filter(level)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install the global tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={:?}",
        options.log_dir,
        options.log_prefix,
        options.debug,
        options.console.map(Verbosity::as_str)
    );

    Ok(guard)
}
