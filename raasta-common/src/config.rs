//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Contents of `raasta/config.toml`
///
/// Every key is optional; services fall back to environment variables and compiled
/// defaults for anything missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database and stored photos
    pub root_folder: Option<String>,
    /// Server listen address, e.g. `127.0.0.1:5001`
    pub bind_addr: Option<String>,
    /// Upload limit for photos in bytes
    pub max_photo_bytes: Option<usize>,
    /// Bearer token → user id, standing in for the external session service
    #[serde(default)]
    pub sessions: HashMap<String, Uuid>,
    /// Settings for the submission client
    #[serde(default)]
    pub client: ClientToml,
}

/// `[client]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientToml {
    pub api_url: Option<String>,
    pub max_attempts: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub backoff_base_ms: Option<u64>,
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml: Option<&TomlConfig>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root_folder) = toml.and_then(|c| c.root_folder.as_deref()) {
        return PathBuf::from(root_folder);
    }

    default_root_folder()
}

/// Locate the config file for the platform, if one exists
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("raasta").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/raasta/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the platform config file, or defaults when there is none
pub fn load_toml_config() -> Result<TomlConfig> {
    match find_config_file() {
        Some(path) => {
            tracing::info!("Loading config from {}", path.display());
            read_toml_config(&path)
        }
        None => Ok(TomlConfig::default()),
    }
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/raasta (or /var/lib/raasta for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("raasta"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/raasta"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("raasta"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/raasta"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("raasta"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\raasta"))
    } else {
        PathBuf::from("./raasta_data")
    }
}

/// Database file inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("raasta.db")
}

/// Photo directory inside a root folder
pub fn photos_dir(root_folder: &Path) -> PathBuf {
    root_folder.join("photos")
}
