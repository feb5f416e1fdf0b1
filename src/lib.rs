// simclient - launcher for the simulation engine library
//
// This is the library crate containing the launcher logic: engine binding,
// plugin loading, command line translation and the simulation thread.
// The binary crate (main.rs) wires it to the process.

pub mod cli;
pub mod config;
pub mod engine;
pub mod launcher;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod platform;
pub mod plugins;
pub mod simulation;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use engine::{BindError, Engine, EngineLibrary, StringParam};
pub use launcher::{LaunchError, LaunchOutcome, Launcher};
pub use metrics::{LaunchMetrics, MetricsSnapshot};
pub use models::{LauncherSettings, PluginRecord, RuntimeOptions, SimulationLifecycleState};
pub use plugins::{LoadPhase, PluginLoader, PluginSet};
pub use simulation::{AutomationHooks, ControlContext, SimulationHooks, SimulationThread, TickContext};
pub use state::{LifecycleChange, LifecycleMonitor};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
