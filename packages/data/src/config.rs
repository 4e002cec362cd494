use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "blocky.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Editor state configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateConfig {
    /// Seeds generated block ids
    #[serde(default = "default_document_name")]
    pub document_name: String,

    /// Most follow-up changesets listeners may queue during one apply
    #[serde(default = "default_max_deferred_changesets")]
    pub max_deferred_changesets: usize,
}

fn default_document_name() -> String {
    "document".to_string()
}

fn default_max_deferred_changesets() -> usize {
    64
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            document_name: default_document_name(),
            max_deferred_changesets: default_max_deferred_changesets(),
        }
    }
}

impl StateConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load config from a directory
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json_str(&content)
        } else {
            Ok(Self::default())
        }
    }
}
