//! Bridge configuration types and defaults.
//!
//! This module defines the configuration options for the bridge, including
//! the scripting context's memory limit and how failures are reported.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default memory limit for the scripting context (0 = unlimited)
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 0;

/// Smallest non-zero memory limit accepted (1 MB)
pub const MIN_MEMORY_LIMIT_BYTES: u64 = 1024 * 1024;

/// Default chunk name used for the bootstrap script in error messages
pub const DEFAULT_CHUNK_NAME: &str = "boot.lua";

/// Configuration for the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Memory limit for the scripting context in bytes (default: 0, unlimited)
    #[serde(default = "default_memory_limit")]
    pub memory_limit_bytes: u64,

    /// Chunk name reported for the bootstrap script (default: boot.lua)
    #[serde(default = "default_chunk_name")]
    pub chunk_name: String,

    /// Forward dispatch failures to the host's error handler (default: true)
    #[serde(default = "default_true")]
    pub forward_errors: bool,

    /// Include Lua tracebacks in diagnostics (default: true)
    #[serde(default = "default_true")]
    pub capture_traceback: bool,

    /// Enable debug mode (default: false)
    #[serde(default)]
    pub debug: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            chunk_name: DEFAULT_CHUNK_NAME.to_string(),
            forward_errors: true,
            capture_traceback: true,
            debug: false,
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Set the memory limit
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    /// Set the bootstrap chunk name
    pub fn with_chunk_name(mut self, name: impl Into<String>) -> Self {
        self.chunk_name = name.into();
        self
    }

    /// Enable or disable forwarding failures to the host
    pub fn with_forward_errors(mut self, forward: bool) -> Self {
        self.forward_errors = forward;
        self
    }

    /// Enable or disable traceback capture
    pub fn with_traceback(mut self, capture: bool) -> Self {
        self.capture_traceback = capture;
        self
    }

    /// Enable debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Memory limit as an option (`None` when unlimited)
    pub fn memory_limit(&self) -> Option<usize> {
        match self.memory_limit_bytes {
            0 => None,
            bytes => Some(usize::try_from(bytes).unwrap_or(usize::MAX)),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_limit_bytes != 0 && self.memory_limit_bytes < MIN_MEMORY_LIMIT_BYTES {
            return Err(ConfigError::InvalidValue {
                field: "memory_limit_bytes".into(),
                reason: "must be 0 (unlimited) or at least 1MB".into(),
            });
        }

        if self.chunk_name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "chunk_name".into(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field name
        field: String,
        /// The reason it's invalid
        reason: String,
    },

    /// Missing required field
    #[error("Missing required configuration field: {field}")]
    MissingField {
        /// The field name
        field: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Default value functions for serde
fn default_memory_limit() -> u64 {
    DEFAULT_MEMORY_LIMIT_BYTES
}

fn default_chunk_name() -> String {
    DEFAULT_CHUNK_NAME.to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.memory_limit_bytes, DEFAULT_MEMORY_LIMIT_BYTES);
        assert_eq!(config.memory_limit(), None);
        assert_eq!(config.chunk_name, DEFAULT_CHUNK_NAME);
        assert!(config.forward_errors);
        assert!(!config.debug);
    }

    #[test]
    fn test_config_builder() {
        let config = BridgeConfig::new()
            .with_memory_limit(8 * 1024 * 1024)
            .with_chunk_name("main.lua")
            .with_forward_errors(false);

        assert_eq!(config.memory_limit(), Some(8 * 1024 * 1024));
        assert_eq!(config.chunk_name, "main.lua");
        assert!(!config.forward_errors);
    }

    #[test]
    fn test_config_validation() {
        let too_small = BridgeConfig::new().with_memory_limit(4096);
        assert!(too_small.validate().is_err());

        let unnamed = BridgeConfig::new().with_chunk_name("  ");
        assert!(matches!(
            unnamed.validate(),
            Err(ConfigError::MissingField { .. })
        ));

        assert!(BridgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config = BridgeConfig::from_json(r#"{ "debug": true }"#).unwrap();
        assert!(config.debug);
        assert!(config.capture_traceback);
        assert_eq!(config.chunk_name, DEFAULT_CHUNK_NAME);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "memoryLimitBytes": 2097152, "forwardErrors": false }}"#).unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.memory_limit_bytes, 2 * 1024 * 1024);
        assert!(!config.forward_errors);
    }

    #[test]
    fn test_config_from_missing_file() {
        let err = BridgeConfig::from_file("/nonexistent/driver-bridge.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
