//! Command line translation.
//!
//! Turns process arguments into [`RuntimeOptions`] and pushes the engine-side
//! parameters before the engine runs. Structural problems (unknown flags,
//! missing values, bad verbosity names) are errors; malformed values of the
//! tolerant options are dropped or defaulted with a warning.

use crate::engine::{Engine, StringParam};
use crate::models::{DialogVerbosity, GuiMode, MAX_APP_ARGS, RuntimeOptions, Verbosity};
use clap::{ArgAction, Parser};
use indexmap::IndexMap;
use std::ffi::{OsStr, OsString};
use thiserror::Error;

/// Long form of the exec flag; must be the first argument.
pub const EXEC_FLAG_LONG: &str = "--exec-program";
pub const EXEC_FLAG_SHORT: &str = "-X";

#[derive(Parser, Debug)]
#[command(
    name = "simclient",
    version,
    about = "Launches the simulation engine, loads its plugins and drives the simulation thread",
    disable_help_flag = true
)]
struct Args {
    /// Print help
    #[arg(long = "help", action = ArgAction::Help)]
    help: Option<bool>,

    /// Emulated headless mode: suppress all GUI elements but otherwise run normally
    #[arg(short = 'h', long = "headless")]
    headless: bool,

    /// True headless mode: no GUI library at all; binds coppeliaSimHeadless
    #[arg(short = 'H', long = "true-headless")]
    true_headless: bool,

    /// Start the simulation automatically; with MS (-s500, -s 500, -s=500), stop it after MS milliseconds of simulated time
    #[arg(
        short = 's',
        long = "auto-start",
        value_name = "MS",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "0",
        allow_hyphen_values = true
    )]
    auto_start: Option<String>,

    /// Quit after the first simulation run ended
    #[arg(short = 'q', long = "auto-quit")]
    auto_quit: bool,

    /// Script string executed once the sandbox script is initialized
    #[arg(short = 'c', long = "cmd", value_name = "SCRIPT", allow_hyphen_values = true)]
    cmd: Option<String>,

    /// Console verbosity
    #[arg(short = 'v', long = "verbosity", value_enum, default_value_t = Verbosity::LoadInfos)]
    verbosity: Verbosity,

    /// Statusbar verbosity
    #[arg(
        short = 'w',
        long = "statusbar-verbosity",
        value_enum,
        default_value_t = Verbosity::ScriptInfos
    )]
    statusbar_verbosity: Verbosity,

    /// Verbosity of simple dialogs
    #[arg(
        short = 'x',
        long = "dialogs-verbosity",
        value_enum,
        default_value_t = DialogVerbosity::Infos
    )]
    dialogs_verbosity: DialogVerbosity,

    /// Additional add-on to load and run
    #[arg(short = 'a', long = "addon", value_name = "FILE")]
    addon: Option<String>,

    /// Second additional add-on to load and run
    #[arg(short = 'b', long = "addon2", value_name = "FILE")]
    addon2: Option<String>,

    /// Named string parameter KEY=VALUE (repeatable)
    #[arg(short = 'G', long = "param", value_name = "KEY=VALUE", action = ArgAction::Append)]
    params: Vec<String>,

    /// Application argument, readable as app_arg1..app_arg9 (repeatable)
    #[arg(short = 'g', long = "arg", value_name = "VALUE", action = ArgAction::Append)]
    args: Vec<String>,

    /// GUI option bitmask
    #[arg(short = 'O', long = "options", value_name = "N", allow_negative_numbers = true)]
    options: Option<i32>,

    /// Scene (.ttt, .simscene.xml) or model (.ttm, .simmodel.xml) to open
    #[arg(value_name = "SCENE_OR_MODEL")]
    files: Vec<String>,
}

/// Command line failures.
#[derive(Error, Debug)]
pub enum CliError {
    /// Structural parse error, or a help/version request.
    #[error(transparent)]
    Parse(#[from] clap::Error),

    #[error("failed to execute {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("--exec-program is not supported on this platform")]
    ExecUnsupported,
}

impl CliError {
    /// Process exit code for this error: 0 for help/version, 2 for parse
    /// errors, 255 when exec failed.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Parse(e) => e.exit_code(),
            CliError::Exec { .. } | CliError::ExecUnsupported => 255,
        }
    }

    /// Print the error the way clap does (help and version go to stdout).
    pub fn print(&self) {
        match self {
            CliError::Parse(e) => {
                let _ = e.print();
            }
            other => eprintln!("{}", other),
        }
    }
}

/// Program and arguments for `-X PROGRAM [ARGS...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecRequest {
    pub program: OsString,
    /// Arguments after the program name.
    pub args: Vec<OsString>,
}

/// Checks for an exec request. Only recognized as the very first argument and
/// only when a program follows it.
pub fn exec_request(argv: &[OsString]) -> Option<ExecRequest> {
    let flag = argv.get(1)?;
    if flag != EXEC_FLAG_LONG && flag != EXEC_FLAG_SHORT {
        return None;
    }
    let program = argv.get(2)?.clone();
    Some(ExecRequest {
        program,
        args: argv[3..].to_vec(),
    })
}

/// Replaces the current process image. Only returns on failure.
#[cfg(unix)]
pub fn exec(request: &ExecRequest) -> CliError {
    use std::os::unix::process::CommandExt;

    tracing::debug!("Executing {:?}", request.program);
    let source = std::process::Command::new(&request.program)
        .args(&request.args)
        .exec();
    CliError::Exec {
        program: request.program.to_string_lossy().into_owned(),
        source,
    }
}

#[cfg(not(unix))]
pub fn exec(_request: &ExecRequest) -> CliError {
    CliError::ExecUnsupported
}

/// Short switches that may share a cluster with `-s` (`-qs500`).
const SWITCH_SHORTS: [char; 3] = ['h', 'H', 'q'];

/// Short flags whose value may be the following argument.
const VALUE_SHORTS: [char; 9] = ['c', 'v', 'w', 'x', 'a', 'b', 'G', 'g', 'O'];

/// Long flags whose value may be the following argument.
const VALUE_LONGS: [&str; 9] = [
    "--cmd",
    "--verbosity",
    "--statusbar-verbosity",
    "--dialogs-verbosity",
    "--addon",
    "--addon2",
    "--param",
    "--arg",
    "--options",
];

/// Whether the argument after `arg` is its value, which must never be
/// rewritten.
fn takes_separate_value(arg: &str) -> bool {
    if VALUE_LONGS.contains(&arg) {
        return true;
    }
    let Some(cluster) = arg.strip_prefix('-').filter(|c| !c.starts_with('-')) else {
        return false;
    };
    let last = cluster.chars().count().saturating_sub(1);
    for (index, c) in cluster.chars().enumerate() {
        if !SWITCH_SHORTS.contains(&c) {
            return VALUE_SHORTS.contains(&c) && index == last;
        }
    }
    false
}

/// Splits an auto-start argument into its leading switches and the attached
/// delay. `None` for anything clap parses unaided, `-s=500` included.
fn split_auto_start(arg: &str) -> Option<(&str, Option<&str>)> {
    if arg == "--auto-start" {
        return Some(("", None));
    }
    let cluster = arg.strip_prefix('-').filter(|c| !c.starts_with('-'))?;
    let pos = cluster.find('s')?;
    let (switches, rest) = (&cluster[..pos], &cluster[pos + 1..]);
    if !switches.chars().all(|c| SWITCH_SHORTS.contains(&c)) || rest.starts_with('=') {
        return None;
    }
    Some((switches, (!rest.is_empty()).then_some(rest)))
}

fn is_delay(arg: &str) -> bool {
    !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit())
}

/// Rewrites every auto-start form into `--auto-start[=MS]` so the delay stays
/// optional without swallowing a following scene:
///
/// - `-s500` and `-qs500` carry the delay attached
/// - `-s 500` and `--auto-start 500` take a following all-digit argument
/// - `-s scene.ttt` leaves the scene alone
fn normalize_auto_start(argv: &[OsString]) -> Vec<OsString> {
    let mut out = Vec::with_capacity(argv.len());
    let mut args = argv.iter().enumerate().peekable();
    let mut previous_takes_value = false;
    let mut after_separator = false;

    while let Some((index, arg)) = args.next() {
        let text = arg.to_str();
        let eligible = index > 0 && !after_separator && !previous_takes_value;
        previous_takes_value = !previous_takes_value && text.is_some_and(takes_separate_value);
        if arg == OsStr::new("--") {
            after_separator = true;
        }

        let Some((switches, attached)) = text.filter(|_| eligible).and_then(split_auto_start)
        else {
            out.push(arg.clone());
            continue;
        };

        if !switches.is_empty() {
            out.push(OsString::from(format!("-{}", switches)));
        }
        let delay = match attached {
            Some(delay) => Some(delay.to_string()),
            None => args
                .next_if(|(_, next)| next.to_str().is_some_and(is_delay))
                .and_then(|(_, next)| next.to_str().map(str::to_string)),
        };
        out.push(match delay {
            Some(delay) => OsString::from(format!("--auto-start={}", delay)),
            None => OsString::from("--auto-start"),
        });
    }
    out
}

/// Parses `KEY=VALUE` entries. Entries without `=`, with an empty key or with
/// an empty value are skipped. A repeated key keeps its first position and
/// takes the last value.
fn parse_named_params(entries: &[String]) -> IndexMap<String, String> {
    let mut params = IndexMap::new();
    for entry in entries {
        match entry.split_once('=') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                params.insert(key.to_string(), value.to_string());
            }
            _ => tracing::warn!("Ignoring malformed named parameter '{}'", entry),
        }
    }
    params
}

fn parse_stop_delay(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid auto-start delay '{}'; auto-stop disabled", raw);
        0
    })
}

/// Parses the full argument vector (including the program name).
pub fn parse_args(argv: &[OsString]) -> Result<RuntimeOptions, CliError> {
    let args = Args::try_parse_from(normalize_auto_start(argv))?;
    Ok(args.into_options())
}

impl Args {
    fn into_options(self) -> RuntimeOptions {
        let gui_mode = if self.true_headless {
            GuiMode::TrueHeadless
        } else if self.headless {
            GuiMode::Headless
        } else {
            GuiMode::Full
        };

        let mut app_args = self.args;
        if app_args.len() > MAX_APP_ARGS {
            tracing::warn!(
                "Only {} application arguments are supported; dropping {}",
                MAX_APP_ARGS,
                app_args.len() - MAX_APP_ARGS
            );
            app_args.truncate(MAX_APP_ARGS);
        }

        let mut files = self.files.into_iter();
        let scene_or_model = files.next();
        let extra = files.count();
        if extra > 0 {
            tracing::warn!("Ignoring {} extra scene/model arguments", extra);
        }

        RuntimeOptions {
            gui_mode,
            gui_options: self.options,
            auto_start: self.auto_start.is_some(),
            stop_delay_ms: self.auto_start.as_deref().map_or(0, parse_stop_delay),
            auto_quit: self.auto_quit,
            scene_or_model,
            console_verbosity: self.verbosity,
            statusbar_verbosity: self.statusbar_verbosity,
            dialog_verbosity: self.dialogs_verbosity,
            named_params: parse_named_params(&self.params),
            app_args,
            startup_script: self.cmd,
            addon_script: self.addon,
            addon_script2: self.addon2,
        }
    }
}

/// Pushes the command-line parameters into the engine. Must run before the
/// engine starts; rejected values are logged and skipped.
pub fn push_configuration(options: &RuntimeOptions, engine: &dyn Engine) {
    let set = |param: StringParam, value: &str| {
        if !engine.set_string_param(param, value) {
            tracing::warn!("Engine rejected {:?} = '{}'", param, value);
        }
    };

    if let Some(script) = &options.startup_script {
        set(StringParam::StartupScript, script);
    }
    set(StringParam::ConsoleVerbosity, options.console_verbosity.as_str());
    set(StringParam::StatusbarVerbosity, options.statusbar_verbosity.as_str());
    set(StringParam::DialogVerbosity, options.dialog_verbosity.as_str());
    if let Some(addon) = &options.addon_script {
        set(StringParam::AddonScript1, addon);
    }
    if let Some(addon) = &options.addon_script2 {
        set(StringParam::AddonScript2, addon);
    }
    for (index, value) in options.app_args.iter().take(MAX_APP_ARGS).enumerate() {
        set(StringParam::AppArg(index as u8), value);
    }

    for (key, value) in &options.named_params {
        if !engine.set_named_string_param(key, value) {
            tracing::warn!("Engine rejected named parameter '{}'", key);
        }
    }
}
