/// Scanner configuration
///
/// Stored as JSON in the user's config directory:
/// - Linux: ~/.config/crate-guardian/config.json
/// - macOS: ~/Library/Application Support/crate-guardian/config.json
/// - Windows: %APPDATA%\crate-guardian\config.json
///
/// A missing file means defaults. Nothing is ever written back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::scan::reference::ReferenceSet;

/// Errors from loading the config file or a reference dataset
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("barcode {0} appears more than once in the reference dataset")]
    DuplicateBarcode(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Simulated scanning delay shown before a result appears
    pub scan_delay_ms: u64,

    /// Optional reference dataset replacing the demo crates
    pub reference_path: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_delay_ms: 1500,
            reference_path: None,
        }
    }
}

impl ScannerConfig {
    /// Where the config file lives, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("crate-guardian");
        path.push("config.json");
        Some(path)
    }

    /// Parse from JSON; unknown keys are ignored, missing keys take defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read `path`, or return defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(json) => {
                let config = Self::from_json(&json)?;
                info!("⚙️  Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn scan_delay(&self) -> Duration {
        Duration::from_millis(self.scan_delay_ms)
    }

    /// The configured reference dataset, or the demo crates
    pub fn reference_set(&self) -> Result<ReferenceSet, ConfigError> {
        match &self.reference_path {
            Some(path) => ReferenceSet::load(path),
            None => Ok(ReferenceSet::demo()),
        }
    }
}
