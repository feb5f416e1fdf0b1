use crate::models::LauncherSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the optional settings file next to the launcher.
pub const SETTINGS_FILE: &str = "simclient.yaml";

/// Prefix of environment variables overriding settings (`SIMCLIENT_DEBUG=true`).
pub const ENV_PREFIX: &str = "SIMCLIENT";

/// Loads and saves [`LauncherSettings`].
///
/// Sources, lowest priority first:
/// - built-in defaults
/// - `simclient.yaml` in the configuration directory (optional)
/// - `SIMCLIENT_*` environment variables (`SIMCLIENT_SYSTEM_PLUGINS` is a
///   comma separated list)
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    env_prefix: String,
}

impl ConfigManager {
    /// Create a ConfigManager reading from `config_dir` (normally the
    /// application directory). The directory is not created.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Self {
        let config_dir = config_dir.as_ref().to_path_buf();
        Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment prefix. Lets tests avoid interference
    /// from the real environment.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load the layered settings.
    ///
    /// # Errors
    /// Fails if the settings file exists but is not valid YAML, or a value has
    /// the wrong type.
    pub fn load_settings(&self) -> Result<LauncherSettings> {
        if self.settings_path.exists() {
            tracing::debug!("Reading launcher settings from {}", self.settings_path);
        }

        let layered = Config::builder()
            .add_source(
                File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false),
            )
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("system_plugins"),
            )
            .build()
            .with_context(|| format!("Failed to read launcher settings: {}", self.settings_path))?;

        let settings: LauncherSettings = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse launcher settings: {}", self.settings_path))?;

        Ok(settings)
    }

    /// Write settings as YAML to the settings file.
    pub fn save_settings(&self, settings: &LauncherSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize launcher settings")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write launcher settings: {}", self.settings_path))?;

        tracing::info!("Saved launcher settings to {}", self.settings_path);
        Ok(())
    }

    /// Write a settings file with the defaults if none exists yet.
    ///
    /// Returns `true` when a file was written.
    pub fn ensure_settings_file(&self) -> Result<bool> {
        if self.settings_path.exists() {
            return Ok(false);
        }
        tracing::info!(
            "Launcher settings not found at {}, writing defaults",
            self.settings_path
        );
        self.save_settings(&LauncherSettings::default())?;
        Ok(true)
    }

    /// Resolve a settings path against the configuration directory.
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
