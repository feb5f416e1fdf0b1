//! Data models shared by the launcher components.
//!
//! - [`RuntimeOptions`]: everything the command line decides, built once before the engine runs
//! - [`PluginRecord`]: one discovered extension module and the outcome of its load attempt
//! - [`SimulationLifecycleState`]: bookkeeping owned by the simulation thread
//! - [`LauncherSettings`]: launcher-only settings from the settings file and environment
//!
//! The models carry no behavior beyond small invariant-keeping helpers; the
//! components in [`crate::plugins`], [`crate::simulation`] and [`crate::launcher`]
//! own the logic.

pub mod config;
pub mod lifecycle;
pub mod options;
pub mod plugin;

pub use config::LauncherSettings;
pub use lifecycle::{SimulationLifecycleState, SimulationState, ThreadPhase};
pub use options::{AssetKind, DialogVerbosity, GuiMode, MAX_APP_ARGS, RuntimeOptions, Verbosity};
pub use plugin::{LoadState, PluginFailure, PluginRecord};
