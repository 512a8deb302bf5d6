//! Configuration IO helpers for MCP client configuration.

use crate::config::{ConfigError, ConfigSource, ValidatedConfig, validate_config};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Reads and decodes a configuration file without validating it.
pub fn read_config(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConfigError::NotFound { path: path.to_path_buf() },
        _ => ConfigError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    serde_json::from_str(&content).map_err(|source| ConfigError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads and validates MCP configuration from a specific path.
pub fn load_config_from_path(path: &Path) -> Result<ValidatedConfig, ConfigError> {
    validate_config(&read_config(path)?)
}

/// Loads and validates MCP configuration from either source.
pub fn load_config(source: &ConfigSource) -> Result<ValidatedConfig, ConfigError> {
    match source {
        ConfigSource::Path(path) => load_config_from_path(path),
        ConfigSource::Value(value) => validate_config(value),
    }
}
