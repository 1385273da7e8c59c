//! Configuration module for the vector store.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `VECSTORE_` and use double
//! underscores to separate nested levels:
//! - `VECSTORE_STORAGE__DIMENSION=384` sets `storage.dimension`
//! - `VECSTORE_STORAGE__ALLOCATOR=mimalloc` sets `storage.allocator`
//! - `VECSTORE_LOGGING__LEVEL=debug` sets `logging.level`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::allocator::AllocatorKind;
use crate::error::StorageError;
use crate::storage::{DEFAULT_DIMENSION, DEFAULT_INITIAL_CAPACITY, StoreOptions, VectorDimension};

/// Default configuration file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "vecstore.toml";

const ENV_PREFIX: &str = "VECSTORE_";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Storage engine settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Vector length for newly created stores
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Slots reserved by `VectorStore::open_configured` for a new file
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,

    /// Side allocator strategy
    #[serde(default)]
    pub allocator: AllocatorKind,

    /// Flush when a handle is dropped without an explicit close
    #[serde(default = "default_true")]
    pub flush_on_drop: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}
fn default_initial_capacity() -> usize {
    DEFAULT_INITIAL_CAPACITY
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            initial_capacity: default_initial_capacity(),
            allocator: AllocatorKind::default(),
            flush_on_drop: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TryFrom<&StorageConfig> for StoreOptions {
    type Error = StorageError;

    fn try_from(config: &StorageConfig) -> Result<Self, Self::Error> {
        Ok(StoreOptions::new()
            .with_dimension(VectorDimension::new(config.dimension)?)
            .with_initial_capacity(config.initial_capacity)
            .with_allocator(config.allocator.strategy()?)
            .with_flush_on_drop(config.flush_on_drop))
    }
}

impl Settings {
    /// Load configuration from defaults, `vecstore.toml` in the current
    /// directory if present, and the environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file, still honoring environment
    /// overrides. A missing file contributes nothing.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            // Double underscore separates nesting levels; single underscores
            // stay part of the field name.
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Options for opening a store under these settings.
    pub fn store_options(&self) -> Result<StoreOptions, StorageError> {
        StoreOptions::try_from(&self.storage)
    }

    /// Path of the default configuration file in the current directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }
}
