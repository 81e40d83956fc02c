//! Runtime configuration.
//!
//! Loaded from TOML. Every key is optional:
//!
//! ```toml
//! first_instance_id = 1
//! warn_on_undefined = true
//! index_strategy = "reverse"
//! max_notifications = 10000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::InstanceId;

/// Default cap on callbacks delivered by one notification drain.
pub const DEFAULT_MAX_NOTIFICATIONS: usize = 10_000;

/// How `delete_component` finds the name bucket holding an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStrategy {
    /// Scan every name bucket. O(registered names) per delete.
    Scan,
    /// Keep an id → name reverse lookup. O(1) per delete.
    #[default]
    Reverse,
}

/// Configuration for a [`SceneRuntime`](crate::SceneRuntime).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// First id handed out when a build asks for a fresh identity.
    pub first_instance_id: InstanceId,
    /// Log a warning when an attribute or directive evaluates to undefined.
    pub warn_on_undefined: bool,
    /// Name index maintenance on delete.
    pub index_strategy: IndexStrategy,
    /// Callbacks one drain may deliver before it is considered runaway.
    pub max_notifications: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            first_instance_id: 1,
            warn_on_undefined: true,
            index_strategy: IndexStrategy::Reverse,
            max_notifications: DEFAULT_MAX_NOTIFICATIONS,
        }
    }
}

impl SceneConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a `.toml` file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
