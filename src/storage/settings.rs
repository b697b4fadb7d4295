//! Settings storage
//!
//! Resolves settings from the JSON config file and `OT_*` environment variables.
//! Command-line flags are applied on top by the binary.

use crate::storage::{get_config_dir, StorageError};
use crate::types::Settings;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_OLLAMA_URL: &str = "OT_OLLAMAURL";
pub const ENV_TIMEOUT: &str = "OT_TIMEOUT";
pub const ENV_CONCURRENCY: &str = "OT_CONCURRENCY";

/// Default settings file path
pub fn default_settings_path() -> Result<PathBuf, StorageError> {
    Ok(get_config_dir()?.join("settings.json"))
}

/// Load settings from `path` (or the default location) and the process environment.
///
/// Returns defaults if the file doesn't exist or is corrupted.
pub fn load_settings(path: Option<&Path>) -> Settings {
    load_settings_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_settings`], reading variables through `lookup`
pub fn load_settings_with<F>(path: Option<&Path>, lookup: F) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match load_settings_internal(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Settings::default()
        }
    };

    apply_env_overrides(&mut settings, lookup);
    settings.validate();
    settings
}

fn load_settings_internal(path: Option<&Path>) -> Result<Settings, StorageError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_settings_path()?,
    };
    load_settings_from(&path)
}

/// Read one settings file. A missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings, StorageError> {
    if !path.exists() {
        tracing::debug!("Settings file {} not found, using defaults", path.display());
        return Ok(Settings::default());
    }

    let json = fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&json)?;

    tracing::info!("Using config file: {}", path.display());
    Ok(settings)
}

/// Override settings from `OT_*` variables; `lookup` returns a variable's value
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_OLLAMA_URL).filter(|v| !v.trim().is_empty()) {
        settings.ollama_url = url;
    }

    if let Some(raw) = lookup(ENV_TIMEOUT) {
        match raw.trim().parse() {
            Ok(secs) => settings.request_timeout_secs = secs,
            Err(_) => tracing::warn!("Ignoring invalid {}: {}", ENV_TIMEOUT, raw),
        }
    }

    if let Some(raw) = lookup(ENV_CONCURRENCY) {
        match raw.trim().parse() {
            Ok(n) => settings.concurrency = n,
            Err(_) => tracing::warn!("Ignoring invalid {}: {}", ENV_CONCURRENCY, raw),
        }
    }
}

/// Save settings as pretty JSON, creating parent directories
pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;

    tracing::debug!("Saved settings to {}", path.display());
    Ok(())
}
