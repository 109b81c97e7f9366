use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cadence_scripting_host::SchedulerConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{break_config::BreakConfig, paths::ProjectPaths, session_config::SessionConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Config file not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not determine the home directory")]
    NoHomeDirectory,

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("IO error accessing config: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Scheduler tuning
    #[serde(default)]
    pub scripting: SchedulerConfig,

    /// Account the scripts run under
    #[serde(default)]
    pub session: SessionConfig,

    /// Periodic breaks
    #[serde(default)]
    pub breaks: BreakConfig,

    /// Scripts started by `cadence run` when no names are given
    #[serde(default)]
    pub autostart: Vec<String>,
}

impl CadenceConfig {
    pub fn config_path() -> Result<PathBuf, ConfigLoadError> {
        ProjectPaths::new("cadence")
            .map(|paths| paths.config_file())
            .ok_or(ConfigLoadError::NoHomeDirectory)
    }

    /// Load from the default location
    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), ConfigLoadError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigLoadError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }
}
