use super::{SimulationHooks, TickContext};
use crate::engine::Engine;
use crate::metrics::LaunchMetrics;
use crate::models::{AssetKind, PluginRecord, RuntimeOptions, SimulationState, Verbosity};
use crate::plugins::{LOG_SOURCE, PluginLoader, PluginSet};
use crate::state::LifecycleChange;
use std::sync::Arc;

/// Command-line automation owned by the simulation thread.
///
/// Copied out of [`RuntimeOptions`] before the thread starts; only the
/// simulation thread mutates it afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutomationPolicy {
    pub pending_path: Option<String>,
    pub auto_start: bool,
    /// Milliseconds of simulated time; 0 is disarmed.
    pub stop_delay_ms: u32,
    pub auto_quit: bool,
}

impl From<&RuntimeOptions> for AutomationPolicy {
    fn from(options: &RuntimeOptions) -> Self {
        Self {
            pending_path: options.scene_or_model.clone(),
            auto_start: options.auto_start,
            stop_delay_ms: options.stop_delay_ms,
            auto_quit: options.auto_quit,
        }
    }
}

/// Default hooks: plugin phases around the run, automation policy per tick.
pub struct AutomationHooks {
    policy: AutomationPolicy,
    loader: PluginLoader,
    candidates: Vec<PluginRecord>,
    plugins: Option<PluginSet>,
    metrics: Option<Arc<LaunchMetrics>>,
}

impl AutomationHooks {
    pub fn new(policy: AutomationPolicy, loader: PluginLoader, candidates: Vec<PluginRecord>) -> Self {
        Self {
            policy,
            loader,
            candidates,
            plugins: None,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<LaunchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy(&self) -> &AutomationPolicy {
        &self.policy
    }

    /// Plugin outcome, once `on_init` has run.
    pub fn plugins(&self) -> Option<&PluginSet> {
        self.plugins.as_ref()
    }

    fn load_pending_asset(&mut self, ctx: &mut TickContext<'_>) {
        let Some(path) = self.policy.pending_path.take() else {
            return;
        };

        let Some(kind) = AssetKind::classify(&path) else {
            let message = format!("unrecognized scene or model file: {}", path);
            tracing::warn!("{}", message);
            ctx.engine.add_log(LOG_SOURCE, Verbosity::Errors, &message);
            self.record_asset_load(false);
            ctx.monitor.publish(LifecycleChange::AssetLoadFailed { path });
            return;
        };

        let loaded = match kind {
            AssetKind::Scene => ctx.engine.load_scene(&path),
            AssetKind::Model => ctx.engine.load_model(&path),
        };
        self.record_asset_load(loaded);

        if loaded {
            tracing::info!("Loaded {} {}", kind, path);
            ctx.monitor.publish(LifecycleChange::AssetLoaded { kind, path });
        } else {
            let message = format!("failed to load {} {}", kind, path);
            tracing::error!("{}", message);
            ctx.engine.add_log(LOG_SOURCE, Verbosity::Errors, &message);
            ctx.monitor.publish(LifecycleChange::AssetLoadFailed { path });
        }
    }

    fn record_asset_load(&self, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_asset_load(success);
        }
    }
}

impl SimulationHooks for AutomationHooks {
    fn on_init(&mut self, engine: &dyn Engine) {
        let candidates = std::mem::take(&mut self.candidates);
        tracing::debug!("Loading {} plugin candidates", candidates.len());
        self.plugins = Some(self.loader.load_all(engine, candidates));
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) {
        self.load_pending_asset(ctx);

        if self.policy.auto_start {
            tracing::info!("Auto-starting simulation");
            ctx.engine.start_simulation();
            self.policy.auto_start = false;
            ctx.lifecycle.auto_started = true;
        }

        let state = ctx.engine.simulation_state();
        if ctx.lifecycle.observe(state) {
            tracing::debug!("Simulation run {} started", ctx.lifecycle.run_count);
            if let Some(metrics) = &self.metrics {
                metrics.record_run();
            }
        }

        if ctx.lifecycle.run_count == 1
            && self.policy.auto_quit
            && state == SimulationState::Stopped
            && !ctx.lifecycle.exit_posted
        {
            tracing::info!("First run finished; auto-quit requesting exit");
            ctx.lifecycle.exit_posted = true;
            ctx.control.request_exit(ctx.engine);
        }

        if self.policy.stop_delay_ms > 0 && ctx.lifecycle.auto_started {
            let now_ms = ctx.engine.simulation_time() * 1000.0;
            if now_ms > f64::from(self.policy.stop_delay_ms) {
                tracing::info!(
                    "Stop delay of {} ms elapsed at {:.0} ms; stopping simulation",
                    self.policy.stop_delay_ms,
                    now_ms
                );
                self.policy.stop_delay_ms = 0;
                ctx.engine.stop_simulation();
                ctx.lifecycle.auto_stopped_at_ms = Some(now_ms as u64);
            }
        }
    }

    fn on_deinit(&mut self, engine: &dyn Engine) {
        if let Some(plugins) = self.plugins.as_mut() {
            let unloaded = plugins.unload_all(engine);
            if let Some(metrics) = &self.metrics {
                for _ in 0..unloaded {
                    metrics.record_plugin_unloaded();
                }
            }
            tracing::info!("Unloaded {} plugins", unloaded);
        }
    }
}
