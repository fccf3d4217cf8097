// src/repository/config.rs

//! Repository configuration
//!
//! Loaded from a TOML file. Every key is optional:
//!
//! ```toml
//! content_dir = "/var/lib/resource-repo/content"
//! verify_on_read = true
//! cache_universe = true
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// TOML configuration for a [`Repository`](super::Repository)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Root directory of the content store
    pub content_dir: PathBuf,

    /// Re-hash blobs when reading them back
    pub verify_on_read: bool,

    /// Share one universe snapshot across a single evaluation
    pub cache_universe: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            verify_on_read: true,
            cache_universe: true,
        }
    }
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("/var/lib/resource-repo/content")
}

impl RepositoryConfig {
    /// Default configuration with the content store at `content_dir`
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded repository configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
