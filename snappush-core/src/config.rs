//! Optional YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! <config_dir>/
//!   snappush/
//!     config.yaml
//! ```
//!
//! # API pattern
//!
//! - `load_at(config_dir)`: explicit base directory; used in tests with `TempDir`
//! - `load()`: derives the base from `dirs::config_dir()`, delegates to `load_at`
//! - `load_file(path)`: an explicitly named file (`--config`); must exist
//!
//! A missing default file is not an error; every field has a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tool-wide settings that do not change per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program used for subvolume list/send/receive/delete.
    pub btrfs: String,
    /// The snapshot manager's per-snapshot descriptor, copied next to each
    /// received subvolume.
    pub metadata_file: String,
    pub ssh: SshConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            btrfs: "btrfs".to_string(),
            metadata_file: "info.xml".to_string(),
            ssh: SshConfig::default(),
        }
    }
}

/// How remote locations are reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub program: String,
    /// Extra arguments placed before the destination, e.g. `["-p", "2222"]`.
    pub options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            options: Vec::new(),
        }
    }
}

/// `<config_dir>/snappush/config.yaml`: pure, no I/O.
pub fn config_path_at(config_dir: &Path) -> PathBuf {
    config_dir.join("snappush").join("config.yaml")
}

/// Load `<config_dir>/snappush/config.yaml`, or defaults when it is absent.
pub fn load_at(config_dir: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(config_dir);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_file(&path)
}

/// `load_at` convenience wrapper. Falls back to defaults when the platform
/// has no config directory.
pub fn load() -> Result<Config, ConfigError> {
    match dirs::config_dir() {
        Some(dir) => load_at(&dir),
        None => Ok(Config::default()),
    }
}

/// Load an explicitly named config file.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
