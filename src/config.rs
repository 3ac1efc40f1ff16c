use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::Path,
};

use crate::error::AsdError;

/// Standard config file name looked up next to a profile by callers that want one.
pub const CONFIG_FILE_NAME: &str = "asd.toml";

/// What to do when two merges supply the same descriptor id with different content.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Abort with [`AsdError::ConflictingDescriptor`].
    #[default]
    Fail,
    /// Keep the first definition seen and log a warning.
    KeepFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsdConfig {
    pub conflict_policy: ConflictPolicy,
    /// Bounds both descriptor nesting while scanning and the length of a cross-file resolution
    /// chain.
    pub max_nesting_depth: usize,
}

impl Default for AsdConfig {
    fn default() -> Self {
        AsdConfig {
            conflict_policy: ConflictPolicy::Fail,
            max_nesting_depth: 64,
        }
    }
}

impl AsdConfig {
    pub fn from_toml(content: &str) -> Result<Self, AsdError> {
        Ok(toml::from_str(content)?)
    }

    /// Read the config at `path`, falling back to the defaults if no file exists there.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AsdError> {
        tracing::debug!("Attempting to read config from: {:?}", path.as_ref());
        if !path.as_ref().exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(AsdConfig::default());
        }
        let content = read_to_string(path)?;
        AsdConfig::from_toml(&content)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), AsdError> {
        tracing::debug!("Attempting to write config to: {:?}", path.as_ref());
        let toml_string = toml::to_string(self)?;
        write(path, toml_string)?;
        Ok(())
    }
}
