//! Application configuration for IndexSync.
//!
//! User config lives at `~/.indexsync/indexsync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexSyncError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "indexsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".indexsync";

// ---------------------------------------------------------------------------
// Config structs (matching indexsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Search-engine connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Index naming settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Engine defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[connection]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the search-engine HTTP endpoint.
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cluster status to wait for before bulk operations
    /// (`"green"`/`"yellow"`); no wait when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_status: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
            wait_for_status: None,
        }
    }
}

fn default_url() -> String {
    "http://localhost:9200".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Prefix prepended (with `_`) to every index name. Keeps environments
    /// apart on a shared cluster and scopes prefix-wide deletion.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    "indexsync".into()
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Policy name for the base strategy frame.
    #[serde(default = "default_strategy")]
    pub strategy: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
        }
    }
}

fn default_strategy() -> String {
    "urgent".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.indexsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| IndexSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.indexsync/indexsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| IndexSyncError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        IndexSyncError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| IndexSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| IndexSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| IndexSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
