//! Plugin discovery and two-phase loading.
//!
//! Extension modules live next to the launcher and follow a platform naming
//! pattern (`libsimExtName.so`, `simExtName.dll`, ...). Loading happens in two
//! explicit phases:
//!
//! 1. [`LoadPhase::System`]: allow-listed plugins that register capabilities
//!    others depend on. When every one of them has been attempted the engine is
//!    told via [`Engine::system_plugins_complete`], exactly once.
//! 2. [`LoadPhase::Remaining`]: everything else, in discovery order.
//!
//! A failed load never aborts a phase: the record is marked failed, logged
//! with its failure kind, and left out of the unload set.

use crate::engine::Engine;
use crate::metrics::LaunchMetrics;
use crate::models::{LoadState, PluginFailure, PluginRecord, Verbosity};
use crate::platform::Platform;
use camino::Utf8Path;
use regex::Regex;
use std::fmt;
use std::fs;
use std::sync::Arc;

/// A derived plugin name containing this character marks a variant build
/// that must not be auto-loaded.
pub const RESERVED_SEPARATOR: char = '_';

/// Plugins loaded in the system phase unless settings override the list.
pub const DEFAULT_SYSTEM_PLUGINS: [&str; 2] = ["MeshCalc", "Dynamics"];

/// Log source used for plugin messages mirrored into the engine log.
pub const LOG_SOURCE: &str = "simclient";

/// Filename pattern for one platform: case-insensitive prefix + extension.
#[derive(Debug, Clone)]
pub struct PluginPattern {
    matcher: Regex,
}

impl PluginPattern {
    pub fn for_platform(platform: Platform) -> Self {
        let prefix = format!("{}simExt", platform.library_prefix());
        let pattern = format!(
            r"(?i)^{}(.+)\.{}$",
            regex::escape(&prefix),
            regex::escape(platform.library_extension())
        );
        Self {
            matcher: Regex::new(&pattern).expect("plugin pattern is a valid regex"),
        }
    }

    /// Plugin name derived from a file name, with its original casing.
    pub fn plugin_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        self.matcher
            .captures(file_name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Lists the auto-loadable plugins in `dir`, sorted by file name.
///
/// Only regular files and symlinks count. Names containing
/// [`RESERVED_SEPARATOR`] are skipped. A missing or unreadable directory gives
/// an empty list.
pub fn discover(dir: &Utf8Path, platform: Platform) -> Vec<PluginRecord> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot scan plugin directory {}: {}", dir, e);
            return Vec::new();
        }
    };

    let pattern = PluginPattern::for_platform(platform);
    let mut file_names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_type()
                .map(|t| t.is_file() || t.is_symlink())
                .unwrap_or(false)
        })
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    file_names.sort();

    let mut candidates = Vec::new();
    for file_name in file_names {
        let Some(name) = pattern.plugin_name(&file_name) else {
            continue;
        };
        if name.contains(RESERVED_SEPARATOR) {
            tracing::debug!("Skipping non-autoloadable plugin variant {}", file_name);
            continue;
        }
        candidates.push(PluginRecord::discovered(name, dir.join(&file_name)));
    }

    tracing::info!("Discovered {} plugin(s) in {}", candidates.len(), dir);
    candidates
}

/// The two loading phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    System,
    Remaining,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::System => f.write_str("system"),
            LoadPhase::Remaining => f.write_str("remaining"),
        }
    }
}

/// Loads discovered plugins in the two ordered phases.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    system_plugins: Vec<String>,
    platform: Platform,
    metrics: Option<Arc<LaunchMetrics>>,
}

impl PluginLoader {
    pub fn new<I, S>(system_plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            system_plugins: system_plugins.into_iter().map(Into::into).collect(),
            platform: Platform::current(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<LaunchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Whether `name` belongs to the system phase.
    pub fn is_system_plugin(&self, name: &str) -> bool {
        self.system_plugins
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name))
    }

    /// Phase a plugin of this name is loaded in.
    pub fn phase_of(&self, name: &str) -> LoadPhase {
        if self.is_system_plugin(name) {
            LoadPhase::System
        } else {
            LoadPhase::Remaining
        }
    }

    /// Runs both phases over `candidates` and returns the resulting set.
    pub fn load_all(&self, engine: &dyn Engine, candidates: Vec<PluginRecord>) -> PluginSet {
        let mut set = PluginSet {
            records: candidates,
            load_order: Vec::new(),
        };

        self.load_phase(engine, &mut set, LoadPhase::System);
        engine.system_plugins_complete();
        tracing::debug!("System plugin phase complete");

        self.load_phase(engine, &mut set, LoadPhase::Remaining);

        tracing::info!(
            "Plugins loaded: {} succeeded, {} failed",
            set.loaded().count(),
            set.failed().count()
        );
        set
    }

    fn load_phase(&self, engine: &dyn Engine, set: &mut PluginSet, phase: LoadPhase) {
        for index in 0..set.records.len() {
            let record = &set.records[index];
            if record.state != LoadState::Discovered || self.phase_of(&record.name) != phase {
                continue;
            }
            if self.load_one(engine, &mut set.records[index]) {
                set.load_order.push(index);
            }
        }
    }

    fn load_one(&self, engine: &dyn Engine, record: &mut PluginRecord) -> bool {
        tracing::info!("Plugin '{}': loading...", record.name);
        let raw = engine.load_module(record.path.as_str(), &record.name);

        match record.resolve(raw) {
            Ok(handle) => {
                tracing::info!("Plugin '{}': load succeeded (handle {})", record.name, handle);
                if let Some(metrics) = &self.metrics {
                    metrics.record_plugin_loaded();
                }
                true
            }
            Err(failure) => {
                let message = match failure {
                    PluginFailure::DependencyFailure => format!(
                        "plugin '{}': load failed ({}); {}",
                        record.name,
                        failure,
                        self.platform.dependency_hint()
                    ),
                    _ => format!("plugin '{}': load failed ({})", record.name, failure),
                };
                tracing::error!("{}", message);
                engine.add_log(LOG_SOURCE, Verbosity::Errors, &message);
                if let Some(metrics) = &self.metrics {
                    metrics.record_plugin_failed();
                }
                false
            }
        }
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PLUGINS)
    }
}

/// Outcome of [`PluginLoader::load_all`]: every record plus the order in
/// which plugins were successfully loaded.
#[derive(Debug, Clone, Default)]
pub struct PluginSet {
    records: Vec<PluginRecord>,
    load_order: Vec<usize>,
}

impl PluginSet {
    pub fn records(&self) -> &[PluginRecord] {
        &self.records
    }

    pub fn loaded(&self) -> impl Iterator<Item = &PluginRecord> {
        self.records.iter().filter(|r| r.is_loaded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PluginRecord> {
        self.records.iter().filter(|r| r.state == LoadState::Failed)
    }

    /// Names of the successfully loaded plugins, in load order.
    pub fn load_order(&self) -> Vec<&str> {
        self.load_order
            .iter()
            .map(|&i| self.records[i].name.as_str())
            .collect()
    }

    /// Unloads every loaded plugin in reverse load order. Records that were
    /// never loaded, or were already unloaded, are left alone. Returns the
    /// number of plugins unloaded by this call.
    pub fn unload_all(&mut self, engine: &dyn Engine) -> usize {
        let mut unloaded = 0;
        for &index in self.load_order.iter().rev() {
            let record = &mut self.records[index];
            if record.state != LoadState::Loaded {
                continue;
            }
            if !engine.unload_module(record.handle) {
                tracing::warn!("Plugin '{}': engine rejected the unload", record.name);
            }
            record.state = LoadState::Unloaded;
            unloaded += 1;
            tracing::debug!("Plugin '{}': unloaded", record.name);
        }
        unloaded
    }
}
