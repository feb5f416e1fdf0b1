//! Foreground unit and shutdown coordinator.
//!
//! [`Launcher::launch`] binds the engine library and hands it to
//! [`Launcher::run_with_engine`], which configures the engine, starts the
//! simulation thread (or runs its loop directly in true-headless mode), waits
//! for it and works out the process exit code.

use crate::cli::push_configuration;
use crate::engine::{BindError, Engine, EngineLibrary, library_file_name};
use crate::metrics::{LaunchMetrics, MetricsSnapshot};
use crate::models::{LauncherSettings, RuntimeOptions, SimulationLifecycleState, Verbosity};
use crate::platform::Platform;
use crate::plugins::{self, LOG_SOURCE, PluginLoader};
use crate::simulation::{
    AutomationHooks, AutomationPolicy, ControlContext, SimulationHooks, SimulationThread,
};
use crate::state::LifecycleMonitor;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Exit code when the engine library cannot be used.
pub const EXIT_LAUNCH_FAILURE: i32 = 255;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("failed to spawn the simulation thread: {0}")]
    SpawnThread(#[source] std::io::Error),

    #[error("simulation thread panicked")]
    SimulationPanicked,
}

impl LaunchError {
    pub fn exit_code(&self) -> i32 {
        EXIT_LAUNCH_FAILURE
    }
}

/// Result of a completed launch.
#[derive(Debug, Clone, Copy)]
pub struct LaunchOutcome {
    pub exit_code: i32,
    pub lifecycle: SimulationLifecycleState,
    pub metrics: MetricsSnapshot,
}

/// Directory containing the running executable.
pub fn application_dir() -> Result<Utf8PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let exe = Utf8PathBuf::try_from(exe).context("Executable path is not valid UTF-8")?;
    let dir = exe
        .parent()
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    Ok(dir)
}

pub struct Launcher {
    settings: LauncherSettings,
    app_dir: Utf8PathBuf,
    platform: Platform,
    metrics: Arc<LaunchMetrics>,
    monitor: LifecycleMonitor,
}

impl Launcher {
    pub fn new(settings: LauncherSettings, app_dir: impl Into<Utf8PathBuf>) -> Self {
        let metrics = Arc::new(LaunchMetrics::new());
        Self {
            settings,
            app_dir: app_dir.into(),
            platform: Platform::current(),
            monitor: LifecycleMonitor::new().with_metrics(metrics.clone()),
            metrics,
        }
    }

    /// Lifecycle events of the launch. Subscribe before launching.
    pub fn monitor(&self) -> &LifecycleMonitor {
        &self.monitor
    }

    pub fn metrics(&self) -> Arc<LaunchMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn app_dir(&self) -> &Utf8Path {
        &self.app_dir
    }

    fn under_app_dir(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.app_dir.join(path)
        }
    }

    /// Where the engine library for these options is looked up.
    pub fn library_path(&self, options: &RuntimeOptions) -> Utf8PathBuf {
        let dir = match &self.settings.library_dir {
            Some(dir) => self.under_app_dir(dir),
            None => self.app_dir.clone(),
        };
        dir.join(library_file_name(self.platform, options.is_true_headless()))
    }

    /// Directory scanned for plugins.
    pub fn plugin_dir(&self) -> Utf8PathBuf {
        match &self.settings.plugin_dir {
            Some(dir) => self.under_app_dir(dir),
            None => self.app_dir.clone(),
        }
    }

    /// Binds the engine library and runs it to completion.
    pub fn launch(&self, options: &RuntimeOptions) -> Result<LaunchOutcome, LaunchError> {
        let path = self.library_path(options);
        let library = EngineLibrary::bind(&path).inspect_err(|e| {
            tracing::error!("{}", e);
        })?;

        self.run_with_engine(Arc::new(library), options)
    }

    /// Runs an already bound engine with the default automation hooks and the
    /// plugins found in [`plugin_dir`](Self::plugin_dir).
    pub fn run_with_engine(
        &self,
        engine: Arc<dyn Engine>,
        options: &RuntimeOptions,
    ) -> Result<LaunchOutcome, LaunchError> {
        let candidates = plugins::discover(&self.plugin_dir(), self.platform);
        tracing::info!("Found {} plugin candidates", candidates.len());

        let loader = PluginLoader::new(self.settings.system_plugins.iter().cloned())
            .with_platform(self.platform)
            .with_metrics(self.metrics());
        let hooks = AutomationHooks::new(AutomationPolicy::from(options), loader, candidates)
            .with_metrics(self.metrics());

        self.run_with_hooks(engine, options, hooks)
    }

    /// Runs an already bound engine with custom hooks.
    pub fn run_with_hooks<H>(
        &self,
        engine: Arc<dyn Engine>,
        options: &RuntimeOptions,
        hooks: H,
    ) -> Result<LaunchOutcome, LaunchError>
    where
        H: SimulationHooks + 'static,
    {
        push_configuration(options, engine.as_ref());

        let control = Arc::new(ControlContext::new());
        let thread = SimulationThread::new(
            Arc::clone(&engine),
            Arc::clone(&control),
            self.monitor.clone(),
            self.app_dir.as_str(),
        )
        .with_metrics(self.metrics());

        engine.add_log(LOG_SOURCE, Verbosity::LoadInfos, "launching the simulator...");

        let lifecycle = if options.is_true_headless() {
            tracing::info!("True headless: running the simulation loop on the main thread");
            let mut hooks = hooks;
            control.open_gate();
            thread.run(&mut hooks)
        } else {
            let handle = thread.spawn(hooks).map_err(LaunchError::SpawnThread)?;
            control.open_gate();

            tracing::info!("Entering the GUI loop (options {:#x})", options.gui_flags());
            engine.run_gui(options.gui_flags());
            tracing::info!("GUI loop returned");

            control.request_exit(engine.as_ref());
            handle.join().map_err(|_| {
                tracing::error!("Simulation thread panicked");
                LaunchError::SimulationPanicked
            })?
        };

        Ok(self.shut_down(engine.as_ref(), lifecycle))
    }

    fn shut_down(&self, engine: &dyn Engine, lifecycle: SimulationLifecycleState) -> LaunchOutcome {
        let exit_code = engine.exit_code().unwrap_or(0);
        self.metrics.log_summary();
        tracing::info!("Exiting with code {}", exit_code);

        LaunchOutcome {
            exit_code,
            lifecycle,
            metrics: self.metrics.snapshot(),
        }
    }
}
