//! Configuration management

use crate::config::{ConfigResult, Environment};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Descriptor filenames tried in order
    pub descriptor_files: Vec<String>,
    /// Log level
    pub log_level: String,
    /// Variables every job starts from
    pub base_env: Environment,
    /// Shell options emitted before each job's exports
    pub shell_prelude: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            descriptor_files: vec![
                "meta.yml".to_string(),
                ".bbtravis.yml".to_string(),
                ".travis.yml".to_string(),
            ],
            log_level: "info".to_string(),
            base_env: [("TRAVIS_PULL_REQUEST", "1")].into_iter().collect(),
            shell_prelude: "set -v; set -e".to_string(),
        }
    }
}

impl Settings {
    /// Parses settings from YAML; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidYaml`](crate::config::ConfigError::InvalidYaml) for malformed text.
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reads a settings file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// I/O failures other than not-found, or malformed YAML.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::debug!(path = %path.display(), "loading settings");
                Self::from_yaml_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}
