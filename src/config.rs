//! Application configuration management.
//!
//! Persistent defaults for the `dedup` command, stored as JSON in the
//! platform config directory. Every field can be overridden on the command
//! line; a missing or unreadable file means built-in defaults.
//!
//! ```json
//! {
//!   "keep": "oldest",
//!   "algorithm": "blake3",
//!   "extra_extensions": ["dsf", "mka"],
//!   "io_threads": 4,
//!   "cache_path": "/data/muxic/dedup_cache.json"
//! }
//! ```

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::resolve::KeepStrategy;
use crate::scanner::SignatureAlgorithm;

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Survivor strategy for unattended runs.
    pub keep: KeepStrategy,
    /// Signature algorithm.
    pub algorithm: SignatureAlgorithm,
    /// Extensions scanned in addition to the built-in media set.
    pub extra_extensions: Vec<String>,
    /// Signing threads; `1` keeps the scan sequential.
    pub io_threads: usize,
    /// Cache file location, overriding the per-user default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keep: KeepStrategy::default(),
            algorithm: SignatureAlgorithm::default(),
            extra_extensions: Vec::new(),
            io_threads: 1,
            cache_path: None,
        }
    }
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            log::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load the configuration from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match Self::read(path) {
            Ok(Some(config)) => {
                log::debug!("Loaded config from {}", path.display());
                config
            }
            Ok(None) => Self::default(),
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(Some(config))
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "muxic", "muxic").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
