//! Persistent storage
//!
//! Locates and reads/writes the JSON settings file. Nothing else is persisted.

pub mod settings;

use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-user configuration directory (e.g. `~/.config/ollama-tools` on Linux)
pub fn get_config_dir() -> Result<PathBuf, StorageError> {
    ProjectDirs::from("io", "ollama-tools", "ollama-tools")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(StorageError::NoConfigDir)
}
