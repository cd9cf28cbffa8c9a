//! Configuration Loader
//!
//! Finds and loads a client configuration, then applies environment overrides.

use crate::client::ClientConfig;
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "ever.toml";

/// Configuration loader
///
/// Resolution order:
/// 1. Project config (`ever.toml` in the start directory or any parent)
/// 2. Global config (`~/.ever/config.toml`), only if no project config was found
/// 3. Built-in default (empty config, engine defaults apply)
///
/// Environment variables (`EVER_*`) are applied on top of whichever was found.
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Create a loader that reads the global config from a custom path
    pub fn with_global_config_path(path: PathBuf) -> Self {
        Self {
            global_config_path: Some(path),
        }
    }

    /// Load configuration starting from the given directory
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<ClientConfig> {
        let config = match Self::find_project_config(start_dir) {
            Some(path) => ClientConfig::load_from_file(&path)?,
            None => self.load_global_config()?,
        };

        self.apply_env_overrides(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<ClientConfig> {
        let config = ClientConfig::load_from_file(config_path)?;
        self.apply_env_overrides(config)
    }

    /// Walk up the directory tree looking for `ever.toml`
    fn find_project_config(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return None,
            }
        }
    }

    /// Load global configuration, defaulting when the file does not exist
    fn load_global_config(&mut self) -> ConfigResult<ClientConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match Self::global_config_dir() {
                Ok(dir) => {
                    let path = dir.join("config.toml");
                    self.global_config_path = Some(path.clone());
                    path
                }
                // No home directory means no global config
                Err(ConfigError::HomeNotFound) => return Ok(ClientConfig::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(ClientConfig::default());
        }

        ClientConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides
    ///
    /// - `EVER_ENDPOINTS`: comma-separated endpoint list (replaces configured ones)
    /// - `EVER_ACCESS_KEY`: project access key
    /// - `EVER_NETWORK_RETRIES`: network retries count
    /// - `EVER_WAIT_FOR_TIMEOUT`: default `wait_for` timeout in milliseconds
    fn apply_env_overrides(&self, mut config: ClientConfig) -> ConfigResult<ClientConfig> {
        if let Ok(endpoints) = env::var("EVER_ENDPOINTS") {
            config.network_mut().endpoints = endpoints
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(access_key) = env::var("EVER_ACCESS_KEY") {
            config.network_mut().access_key = Some(access_key);
        }

        if let Ok(retries) = env::var("EVER_NETWORK_RETRIES") {
            let retries = retries.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "EVER_NETWORK_RETRIES".to_string(),
                reason: format!("'{}' is not an integer", retries),
            })?;
            config.network_mut().network_retries_count = Some(retries);
        }

        if let Ok(timeout) = env::var("EVER_WAIT_FOR_TIMEOUT") {
            let timeout = timeout.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "EVER_WAIT_FOR_TIMEOUT".to_string(),
                reason: format!("'{}' is not a number of milliseconds", timeout),
            })?;
            config.network_mut().wait_for_timeout = Some(timeout);
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the global configuration directory (~/.ever)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".ever"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
