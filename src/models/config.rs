use crate::plugins::DEFAULT_SYSTEM_PLUGINS;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Launcher settings from `simclient.yaml` and `SIMCLIENT_*` variables.
///
/// Everything here is about the launcher itself; engine configuration comes
/// from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherSettings {
    /// Directory for rotating log files, relative to the application directory
    #[serde(default = "default_log_dir")]
    pub log_dir: Utf8PathBuf,

    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,

    /// Write a log file in addition to the console
    #[serde(default = "default_true")]
    pub file_log: bool,

    #[serde(default = "default_true")]
    pub console_log: bool,

    /// Force debug level on every log layer
    #[serde(default)]
    pub debug: bool,

    /// Plugins loaded before all others
    #[serde(default = "default_system_plugins")]
    pub system_plugins: Vec<String>,

    /// Scan this directory for plugins instead of the application directory
    #[serde(default)]
    pub plugin_dir: Option<Utf8PathBuf>,

    /// Look for the engine library here instead of the application directory
    #[serde(default)]
    pub library_dir: Option<Utf8PathBuf>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            file_log: true,
            console_log: true,
            debug: false,
            system_plugins: default_system_plugins(),
            plugin_dir: None,
            library_dir: None,
        }
    }
}

fn default_log_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("logs")
}

fn default_log_prefix() -> String {
    "simclient".to_string()
}

fn default_true() -> bool {
    true
}

fn default_system_plugins() -> Vec<String> {
    DEFAULT_SYSTEM_PLUGINS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_settings_defaults() {
        let settings = LauncherSettings::default();
        assert_eq!(settings.log_dir, Utf8PathBuf::from("logs"));
        assert!(settings.file_log);
        assert!(settings.console_log);
        assert!(!settings.debug);
        assert_eq!(settings.system_plugins, vec!["MeshCalc", "Dynamics"]);
        assert!(settings.plugin_dir.is_none());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let settings: LauncherSettings = serde_yaml_ng::from_str("debug: true\n").unwrap();
        assert!(settings.debug);
        assert_eq!(settings.log_prefix, "simclient");
        assert_eq!(settings.system_plugins.len(), 2);
    }
}
