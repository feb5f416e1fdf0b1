use clap::ValueEnum;
use indexmap::IndexMap;
use std::fmt;

use crate::engine::consts;

/// Maximum number of positional application arguments the engine exposes
/// (`app_arg1` .. `app_arg9`).
pub const MAX_APP_ARGS: usize = 9;

/// How the engine should present itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GuiMode {
    /// Regular windowed mode.
    #[default]
    Full,
    /// GUI library loaded, but every GUI element suppressed.
    Headless,
    /// No GUI library at all; a different engine build is bound.
    TrueHeadless,
}

/// Verbosity levels understood by the engine's console and statusbar sinks.
///
/// The numeric values are the engine's own log levels and are passed through
/// unchanged when the launcher writes into the engine log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Verbosity {
    #[value(name = "none")]
    None,
    #[value(name = "errors")]
    Errors,
    #[value(name = "warnings")]
    Warnings,
    #[value(name = "loadinfos")]
    LoadInfos,
    #[value(name = "scripterrors")]
    ScriptErrors,
    #[value(name = "scriptwarnings")]
    ScriptWarnings,
    #[value(name = "scriptinfos")]
    ScriptInfos,
    #[value(name = "infos")]
    Infos,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
    #[value(name = "tracelua")]
    TraceLua,
    #[value(name = "traceall")]
    TraceAll,
}

impl Verbosity {
    /// Name as accepted on the command line and by the engine.
    pub fn as_str(self) -> &'static str {
        match self {
            Verbosity::None => "none",
            Verbosity::Errors => "errors",
            Verbosity::Warnings => "warnings",
            Verbosity::LoadInfos => "loadinfos",
            Verbosity::ScriptErrors => "scripterrors",
            Verbosity::ScriptWarnings => "scriptwarnings",
            Verbosity::ScriptInfos => "scriptinfos",
            Verbosity::Infos => "infos",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
            Verbosity::TraceLua => "tracelua",
            Verbosity::TraceAll => "traceall",
        }
    }

    /// Engine log level for this verbosity.
    pub fn level(self) -> i32 {
        match self {
            Verbosity::None => consts::VERBOSITY_NONE,
            Verbosity::Errors => consts::VERBOSITY_ERRORS,
            Verbosity::Warnings => consts::VERBOSITY_WARNINGS,
            Verbosity::LoadInfos => consts::VERBOSITY_LOADINFOS,
            Verbosity::ScriptErrors => consts::VERBOSITY_SCRIPTERRORS,
            Verbosity::ScriptWarnings => consts::VERBOSITY_SCRIPTWARNINGS,
            Verbosity::ScriptInfos => consts::VERBOSITY_SCRIPTINFOS,
            Verbosity::Infos => consts::VERBOSITY_INFOS,
            Verbosity::Debug => consts::VERBOSITY_DEBUG,
            Verbosity::Trace => consts::VERBOSITY_TRACE,
            Verbosity::TraceLua => consts::VERBOSITY_TRACELUA,
            Verbosity::TraceAll => consts::VERBOSITY_TRACEALL,
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbosity for the engine's simple dialogs. Smaller set than [`Verbosity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum DialogVerbosity {
    #[value(name = "none")]
    None,
    #[value(name = "errors")]
    Errors,
    #[value(name = "warnings")]
    Warnings,
    #[value(name = "questions")]
    Questions,
    /// Engine default; shows every dialog.
    #[value(name = "infos")]
    Infos,
}

impl DialogVerbosity {
    pub fn as_str(self) -> &'static str {
        match self {
            DialogVerbosity::None => "none",
            DialogVerbosity::Errors => "errors",
            DialogVerbosity::Warnings => "warnings",
            DialogVerbosity::Questions => "questions",
            DialogVerbosity::Infos => "infos",
        }
    }
}

impl fmt::Display for DialogVerbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of file passed as the positional argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Scene,
    Model,
}

impl AssetKind {
    const SCENE_SUFFIXES: [&'static str; 2] = [".ttt", ".simscene.xml"];
    const MODEL_SUFFIXES: [&'static str; 2] = [".ttm", ".simmodel.xml"];

    /// Classifies a path by its suffix. Returns `None` for anything that is
    /// neither a scene nor a model.
    pub fn classify(path: &str) -> Option<Self> {
        if Self::SCENE_SUFFIXES.iter().any(|s| path.ends_with(s)) {
            Some(AssetKind::Scene)
        } else if Self::MODEL_SUFFIXES.iter().any(|s| path.ends_with(s)) {
            Some(AssetKind::Model)
        } else {
            None
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Scene => f.write_str("scene"),
            AssetKind::Model => f.write_str("model"),
        }
    }
}

/// Everything the command line decides about a run.
///
/// Built once before the engine is bound and never mutated afterwards: the
/// engine rejects configuration calls once it is running, and the automation
/// scalars are copied into the simulation thread's own policy.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeOptions {
    pub gui_mode: GuiMode,
    /// Explicit GUI option bitmask (`-O`). Ignored in headless modes.
    pub gui_options: Option<i32>,

    pub auto_start: bool,
    /// Auto-stop delay in milliseconds of simulated time. 0 means disarmed.
    pub stop_delay_ms: u32,
    pub auto_quit: bool,

    pub scene_or_model: Option<String>,

    pub console_verbosity: Verbosity,
    pub statusbar_verbosity: Verbosity,
    pub dialog_verbosity: DialogVerbosity,

    pub named_params: IndexMap<String, String>,
    /// At most [`MAX_APP_ARGS`] entries.
    pub app_args: Vec<String>,

    pub startup_script: Option<String>,
    pub addon_script: Option<String>,
    pub addon_script2: Option<String>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            gui_mode: GuiMode::Full,
            gui_options: None,
            auto_start: false,
            stop_delay_ms: 0,
            auto_quit: false,
            scene_or_model: None,
            console_verbosity: Verbosity::LoadInfos,
            statusbar_verbosity: Verbosity::ScriptInfos,
            dialog_verbosity: DialogVerbosity::Infos,
            named_params: IndexMap::new(),
            app_args: Vec::new(),
            startup_script: None,
            addon_script: None,
            addon_script2: None,
        }
    }
}

impl RuntimeOptions {
    /// Whether the headless engine build must be bound.
    pub fn is_true_headless(&self) -> bool {
        self.gui_mode == GuiMode::TrueHeadless
    }

    /// Option bitmask handed to the engine's GUI loop.
    pub fn gui_flags(&self) -> i32 {
        match self.gui_mode {
            GuiMode::TrueHeadless => 0,
            GuiMode::Headless => consts::GUI_HEADLESS,
            GuiMode::Full => self.gui_options.unwrap_or(consts::GUI_ALL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_options_defaults() {
        let options = RuntimeOptions::default();
        assert_eq!(options.gui_mode, GuiMode::Full);
        assert_eq!(options.console_verbosity, Verbosity::LoadInfos);
        assert_eq!(options.statusbar_verbosity, Verbosity::ScriptInfos);
        assert_eq!(options.dialog_verbosity, DialogVerbosity::Infos);
        assert_eq!(options.gui_flags(), consts::GUI_ALL);
        assert!(!options.is_true_headless());
    }

    #[test]
    fn test_gui_flags_per_mode() {
        let mut options = RuntimeOptions {
            gui_options: Some(7),
            ..RuntimeOptions::default()
        };
        assert_eq!(options.gui_flags(), 7);

        options.gui_mode = GuiMode::Headless;
        assert_eq!(options.gui_flags(), consts::GUI_HEADLESS);

        options.gui_mode = GuiMode::TrueHeadless;
        assert_eq!(options.gui_flags(), 0);
    }

    #[test]
    fn test_asset_classification() {
        assert_eq!(AssetKind::classify("robot.ttt"), Some(AssetKind::Scene));
        assert_eq!(AssetKind::classify("robot.simscene.xml"), Some(AssetKind::Scene));
        assert_eq!(AssetKind::classify("arm.ttm"), Some(AssetKind::Model));
        assert_eq!(AssetKind::classify("arm.simmodel.xml"), Some(AssetKind::Model));
        assert_eq!(AssetKind::classify("notes.txt"), None);
        assert_eq!(AssetKind::classify("ttt"), None);
    }

    #[test]
    fn test_verbosity_names_round_trip_through_clap() {
        for verbosity in Verbosity::value_variants() {
            let parsed = Verbosity::from_str(verbosity.as_str(), false).unwrap();
            assert_eq!(parsed, *verbosity);
        }
        assert!(Verbosity::LoadInfos.level() < Verbosity::Debug.level());
    }
}
