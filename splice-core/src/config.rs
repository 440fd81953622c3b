//! Engine configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Engine settings, loadable from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tool name of the fallback used for unregistered programs
    #[serde(default = "default_not_found_tool")]
    pub not_found_tool: String,

    /// How many per-program reference sets to keep
    #[serde(default = "default_reference_cache_capacity")]
    pub reference_cache_capacity: usize,

    /// Label given to the previous-cell variable of chained networks
    #[serde(default = "default_prev_label")]
    pub prev_label: String,
}

fn default_not_found_tool() -> String {
    String::from("not-found")
}

fn default_reference_cache_capacity() -> usize {
    1024
}

fn default_prev_label() -> String {
    String::from("prev")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            not_found_tool: default_not_found_tool(),
            reference_cache_capacity: default_reference_cache_capacity(),
            prev_label: default_prev_label(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
