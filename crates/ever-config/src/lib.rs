//! Client configuration for the ever-client binding
//!
//! The foreign engine receives its whole configuration once, as a single JSON
//! blob, when the client context is created. This crate owns the shape of that
//! blob and the ways of producing it:
//! - Built-in defaults matching the engine's recommended settings
//! - Project configuration (`ever.toml`, found by walking up from a directory)
//! - Global user configuration (`~/.ever/config.toml`)
//! - Environment variable overrides (`EVER_*`)
//!
//! # Configuration Hierarchy
//!
//! Later sources override earlier ones:
//! 1. Global config (~/.ever/config.toml), used only when no project config exists
//! 2. Project config (./ever.toml)
//! 3. Environment variables (EVER_*)
//!
//! # Example
//!
//! ```no_run
//! use ever_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod client;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use client::{
    devnet_endpoints, localnet_endpoints, mainnet_endpoints, AbiConfig, BindingConfig,
    BocConfig, ClientConfig, CryptoConfig, MnemonicDictionary, NetworkConfig,
    NetworkQueriesProtocol, ProofsConfig,
};
pub use loader::ConfigLoader;
