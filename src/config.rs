//! Configuration loaded from `liveimport.toml`.
//!
//! Format:
//! ```toml
//! workspace = ["src", "/opt/notebook-utils"]
//! source_extensions = ["py"]
//! hidden_cell_magic = true
//!
//! [autosync]
//! enabled = true
//! grace_secs = 1.0
//! report = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LiveImportError, Result};

/// Name of the configuration file looked up by [`LiveImportConfig::discover`]
pub const CONFIG_FILENAME: &str = "liveimport.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveImportConfig {
    /// Workspace directories; the current directory when absent
    pub workspace: Option<Vec<PathBuf>>,

    /// File extensions of reloadable module sources
    pub source_extensions: Vec<String>,

    pub autosync: AutoSyncConfig,

    /// Treat cells starting with `#_%%liveimport` as cell magic
    pub hidden_cell_magic: bool,
}

impl Default for LiveImportConfig {
    fn default() -> Self {
        Self {
            workspace: None,
            source_extensions: vec!["py".to_string()],
            autosync: AutoSyncConfig::default(),
            hidden_cell_magic: true,
        }
    }
}

/// Automatic sync between cell executions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSyncConfig {
    pub enabled: bool,

    /// Minimum quiet time between one cell finishing and the next starting
    /// before a sync runs
    pub grace_secs: f64,

    /// Report reloads as markdown console blocks
    pub report: bool,
}

impl Default for AutoSyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grace_secs: 1.0,
            report: true,
        }
    }
}

impl LiveImportConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let config: LiveImportConfig = toml::from_str(content)
            .map_err(|e| LiveImportError::Config(format!("Invalid {}: {}", CONFIG_FILENAME, e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load `dir/liveimport.toml` if present, else defaults. Relative
    /// workspace directories are taken relative to `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILENAME);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let mut config = Self::load(&path)?;
        if let Some(dirs) = &mut config.workspace {
            for entry in dirs.iter_mut() {
                if entry.is_relative() {
                    *entry = dir.join(&*entry);
                }
            }
        }
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.source_extensions.is_empty() {
            return Err(LiveImportError::Config(
                "source_extensions must not be empty".to_string(),
            ));
        }
        if !self.autosync.grace_secs.is_finite() || self.autosync.grace_secs < 0.0 {
            return Err(LiveImportError::Config(format!(
                "autosync.grace_secs must be a non-negative number, got {}",
                self.autosync.grace_secs
            )));
        }
        Ok(())
    }
}
