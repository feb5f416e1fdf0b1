//! Simulation thread.
//!
//! The simulation thread is the only unit that steps the engine. It waits for
//! the foreground unit to open the init gate, initializes the engine, runs the
//! [`SimulationHooks`] around every tick and winds the engine down once the
//! exit signal is raised.
//!
//! Both execution units share a [`ControlContext`] by reference. It carries
//! the monotonic exit signal and the one-shot init gate; nothing else crosses
//! the thread boundary.

pub mod automation;

pub use automation::{AutomationHooks, AutomationPolicy};

use crate::engine::Engine;
use crate::metrics::LaunchMetrics;
use crate::models::{SimulationLifecycleState, ThreadPhase};
use crate::state::LifecycleMonitor;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

/// Name of the spawned simulation thread.
pub const SIMULATION_THREAD_NAME: &str = "simclient-sim";

/// Control structure shared by the foreground unit and the simulation thread.
#[derive(Debug)]
pub struct ControlContext {
    exit: AtomicBool,
    gate_tx: Mutex<Option<oneshot::Sender<()>>>,
    gate_rx: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ControlContext {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            exit: AtomicBool::new(false),
            gate_tx: Mutex::new(Some(tx)),
            gate_rx: Mutex::new(Some(rx)),
        }
    }

    /// Raises the exit signal. The first call also posts the request to the
    /// engine so its GUI loop winds down; later calls do nothing.
    pub fn request_exit(&self, engine: &dyn Engine) {
        if !self.exit.swap(true, Ordering::SeqCst) {
            tracing::debug!("Exit requested");
            engine.post_exit_request();
        }
    }

    /// Whether exit was requested, either here or by the engine itself.
    /// An engine-side request is latched into the local flag.
    pub fn poll_exit(&self, engine: &dyn Engine) -> bool {
        if self.exit.load(Ordering::SeqCst) {
            return true;
        }
        if engine.exit_requested() {
            self.exit.store(true, Ordering::SeqCst);
            return true;
        }
        false
    }

    pub fn exit_raised(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }

    /// Opens the init gate. Returns `false` if it was already opened or the
    /// waiting side is gone.
    pub fn open_gate(&self) -> bool {
        let sender = self.gate_tx.lock().ok().and_then(|mut tx| tx.take());
        match sender {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Blocks until the init gate is opened. Returns `false` if the gate can
    /// never open (opener dropped, or already waited on).
    ///
    /// Must not be called from inside a tokio runtime.
    pub fn wait_for_gate(&self) -> bool {
        let receiver = self.gate_rx.lock().ok().and_then(|mut rx| rx.take());
        match receiver {
            Some(rx) => rx.blocking_recv().is_ok(),
            None => false,
        }
    }

    /// Drops the opener without opening, releasing a waiting thread with
    /// `false`.
    pub fn abandon_gate(&self) {
        if let Ok(mut tx) = self.gate_tx.lock() {
            tx.take();
        }
    }
}

impl Default for ControlContext {
    fn default() -> Self {
        Self::new()
    }
}

/// What a hook sees during one tick.
pub struct TickContext<'a> {
    pub engine: &'a dyn Engine,
    pub control: &'a ControlContext,
    pub monitor: &'a LifecycleMonitor,
    pub lifecycle: &'a mut SimulationLifecycleState,
}

/// Behavior injected into the simulation thread.
pub trait SimulationHooks: Send {
    /// After engine initialize, before the first tick.
    fn on_init(&mut self, _engine: &dyn Engine) {}

    /// Before every engine step.
    fn on_tick(&mut self, ctx: &mut TickContext<'_>);

    /// After the loop exits, before engine deinitialize.
    fn on_deinit(&mut self, _engine: &dyn Engine) {}
}

/// Raises the exit signal if the simulation thread unwinds, so the engine's
/// GUI loop returns and the panic reaches the joining thread.
struct ExitOnUnwind {
    engine: Arc<dyn Engine>,
    control: Arc<ControlContext>,
}

impl Drop for ExitOnUnwind {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!("Simulation thread panicked; requesting exit");
            self.control.request_exit(self.engine.as_ref());
        }
    }
}

/// Drives one simulation thread.
pub struct SimulationThread {
    engine: Arc<dyn Engine>,
    control: Arc<ControlContext>,
    monitor: LifecycleMonitor,
    app_dir: String,
    metrics: Option<Arc<LaunchMetrics>>,
}

impl SimulationThread {
    pub fn new(
        engine: Arc<dyn Engine>,
        control: Arc<ControlContext>,
        monitor: LifecycleMonitor,
        app_dir: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            control,
            monitor,
            app_dir: app_dir.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<LaunchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs the loop on a new thread named [`SIMULATION_THREAD_NAME`].
    pub fn spawn<H>(self, hooks: H) -> io::Result<JoinHandle<SimulationLifecycleState>>
    where
        H: SimulationHooks + 'static,
    {
        let mut hooks = hooks;
        let guard = ExitOnUnwind {
            engine: Arc::clone(&self.engine),
            control: Arc::clone(&self.control),
        };
        thread::Builder::new()
            .name(SIMULATION_THREAD_NAME.to_string())
            .spawn(move || {
                let _guard = guard;
                self.run(&mut hooks)
            })
    }

    /// Runs the loop on the calling thread until exit, returning the final
    /// lifecycle state.
    pub fn run(self, hooks: &mut dyn SimulationHooks) -> SimulationLifecycleState {
        let engine = self.engine.as_ref();
        let control = self.control.as_ref();
        let mut lifecycle = SimulationLifecycleState::default();

        if !control.wait_for_gate() {
            tracing::warn!("Init gate closed without opening; simulation thread not started");
            return self.finish(lifecycle, false);
        }

        let before = lifecycle;
        lifecycle.phase = ThreadPhase::Initializing;
        self.monitor.publish_changes(&before, &lifecycle);

        tracing::info!("Initializing engine (app dir: {})", self.app_dir);
        if !engine.initialize(&self.app_dir) {
            tracing::error!("Engine initialization failed");
            control.request_exit(engine);
            return self.finish(lifecycle, false);
        }

        hooks.on_init(engine);

        let before = lifecycle;
        lifecycle.phase = ThreadPhase::Running;
        self.monitor.publish_changes(&before, &lifecycle);

        while !control.poll_exit(engine) {
            let before = lifecycle;
            {
                let mut ctx = TickContext {
                    engine,
                    control,
                    monitor: &self.monitor,
                    lifecycle: &mut lifecycle,
                };
                hooks.on_tick(&mut ctx);
            }
            engine.step();
            lifecycle.ticks += 1;
            if let Some(metrics) = &self.metrics {
                metrics.record_tick();
            }
            self.monitor.publish_changes(&before, &lifecycle);
        }

        let before = lifecycle;
        lifecycle.mark_exit_requested();
        self.monitor.publish_changes(&before, &lifecycle);
        tracing::info!("Exit observed after {} ticks", lifecycle.ticks);

        hooks.on_deinit(engine);
        self.finish(lifecycle, true)
    }

    fn finish(
        &self,
        mut lifecycle: SimulationLifecycleState,
        initialized: bool,
    ) -> SimulationLifecycleState {
        if initialized {
            self.engine.deinitialize();
            tracing::info!("Engine deinitialized");
        }
        let before = lifecycle;
        lifecycle.phase = ThreadPhase::Exited;
        self.monitor.publish_changes(&before, &lifecycle);
        lifecycle
    }
}
