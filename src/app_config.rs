//! Module for application configuration settings.
//!
//! User configurations may be specified in a TOML configuration file.

use bytesize::ByteSize;
use thiserror::Error;
use tracing::debug;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use fcache::ManagerConfig;
use fcache::cache::manager::{DEFAULT_CHUNK_SIZE, DEFAULT_MEMORY_LIMIT};

fn default_memory_limit() -> ByteSize {
    ByteSize::b(DEFAULT_MEMORY_LIMIT)
}

fn default_chunk_size() -> ByteSize {
    ByteSize::b(DEFAULT_CHUNK_SIZE as u64)
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// The cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// The maximum aggregate size of cached file data.
    #[serde(default = "default_memory_limit")]
    pub memory_limit: ByteSize,

    /// Advisory read granularity. Files are currently always read whole.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: ByteSize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_limit: default_memory_limit(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Application configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    /// The directory virtual paths are resolved against.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            root: default_root(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation errors: {0:?}")]
    ValidationErrors(Vec<String>),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Config {
    /// Validate the correctness of the configuration.
    ///
    /// Returns:
    /// - `Ok(())` if the configuration is valid.
    /// - `Err(Vec<String>)` containing every validation error message otherwise.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("memory-limit", self.cache.memory_limit),
            ("chunk-size", self.cache.chunk_size),
        ] {
            if value.as_u64() == 0 {
                errors.push(format!("cache.{name} must be greater than zero."));
            } else if usize::try_from(value.as_u64()).is_err() {
                errors.push(format!(
                    "cache.{name} of {value} cannot be addressed on this platform."
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Returns config file paths in descending priority order.
    fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(not(target_os = "macos"))]
        if let Some(xdg) = dirs::config_dir() {
            paths.push(xdg.join("fcache").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("fcache").join("config.toml"));
        }

        paths.push(PathBuf::from("/etc/fcache/config.toml"));

        paths
    }

    /// Finds the first existing config file from search paths.
    fn find_config_file() -> Option<PathBuf> {
        Self::config_search_paths().into_iter().find(|p| p.exists())
    }

    /// Loads config from a single TOML file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = ?path, "Loading configuration file.");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Renders the config as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads configuration from the external path if given, or else the first found config file.
    pub fn load(external_config_path: Option<&Path>) -> Option<Result<Self, ConfigError>> {
        if let Some(path) = external_config_path {
            return Some(Self::load_from_file(path));
        }

        Self::find_config_file().map(|path| Self::load_from_file(&path))
    }

    /// Loads config, falling back to defaults if no file exists.
    /// Errors if a config file exists but is malformed or invalid.
    pub fn load_or_default(external_config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(res) = Self::load(external_config_path) else {
            debug!("No configuration file found, using defaults.");
            return Ok(Self::default());
        };

        let config = res?;
        if let Err(validation_errors) = config.validate() {
            return Err(ConfigError::ValidationErrors(validation_errors));
        }
        debug!("Loaded configuration successfully.");
        Ok(config)
    }

    /// Converts into the library's construction-time settings.
    pub fn manager_config(&self) -> Result<ManagerConfig, ConfigError> {
        self.validate().map_err(ConfigError::ValidationErrors)?;
        let to_usize = |size: ByteSize| usize::try_from(size.as_u64()).unwrap_or(usize::MAX);
        Ok(ManagerConfig {
            memory_limit: to_usize(self.cache.memory_limit),
            chunk_size: to_usize(self.cache.chunk_size),
            root: self.root.clone(),
        })
    }
}
