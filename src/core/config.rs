//! Configuration persistence
//!
//! Loads [`AppConfig`] from a JSON file. Every field has a default, so a
//! partial file only overrides what it names.
//!
//! # File Location
//!
//! An explicit path wins. Otherwise `config.json` in the user's configuration
//! directory, e.g. `~/.config/chess-opponent/config.json` on Linux, falling
//! back to `config.json` in the working directory when no such directory exists.
//!
//! # Error Handling
//!
//! [`AppConfig::load_or_default`] never fails: unreadable or invalid files are
//! logged and replaced by defaults. [`AppConfig::load_from`] reports errors to
//! the caller.

use crate::core::error::{CoreError, CoreResult};
use crate::game::types::SessionSettings;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uci_client::EngineConfig;

/// Config filename
const CONFIG_FILENAME: &str = "config.json";

/// Everything the binary needs to start a game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub session: SessionSettings,
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: Option<String>,
}

/// Resolves the per-user config file path
pub fn default_config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("org", "chess-opponent", "chess-opponent") {
        proj_dirs.config_dir().join(CONFIG_FILENAME)
    } else {
        PathBuf::from(CONFIG_FILENAME)
    }
}

impl AppConfig {
    /// Reads and validates `path`
    pub fn load_from(path: &Path) -> CoreResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` (or the default location), falling back to defaults on any problem
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);

        if !path.exists() {
            info!("[CONFIG] No config file at {:?}. Using defaults.", path);
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                info!("[CONFIG] Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                warn!(
                    "[CONFIG] Failed to load config at {:?}: {}. Using defaults.",
                    path, e
                );
                Self::default()
            }
        }
    }

    /// Writes the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("[CONFIG] Saved config to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.session
            .validate()
            .map_err(|message| CoreError::InvalidConfig { message })?;
        if self.engine.search_timeout_factor == 0 {
            return Err(CoreError::InvalidConfig {
                message: "engine.search_timeout_factor must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
