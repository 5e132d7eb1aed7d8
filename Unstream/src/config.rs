//! Persisted settings
//!
//! Stored as JSON in the platform config directory. Missing or unreadable
//! files fall back to defaults; command-line flags override any value.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Directory name under the platform config directory.
const APP_DIR: &str = "unstream";

/// User configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the Oodle shared library
    pub oodle_library: Option<PathBuf>,
    /// The game's `base` directory, used for shard discovery
    pub game_base: Option<PathBuf>,
    /// Shard file names consulted before the package map's
    pub priority_shards: Vec<String>,
    /// Default export destination
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Get the config file path
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("config.json"))
    }

    /// Load config from disk, or return default
    #[must_use]
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| Self::load_from(path).ok())
            .unwrap_or_default()
    }

    /// Load config from a specific file.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read and a JSON error if it
    /// is malformed.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to the platform config directory.
    ///
    /// # Errors
    /// Returns an error if no config directory exists or the file cannot be
    /// written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()
            .ok_or_else(|| Error::InvalidPath("no platform config directory".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to a specific file, creating its directory.
    ///
    /// # Errors
    /// Returns an I/O or JSON error.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }
}
