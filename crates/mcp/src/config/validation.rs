//! Configuration validation for MCP servers.
//!
//! Turns a decoded JSON value into a [`ValidatedConfig`]. Validation is
//! all-or-nothing: the first offending entry fails the whole call and no
//! descriptor escapes.

use crate::config::model::{
    ConfigError, DEFAULT_PROTOCOL_VERSION, McpConfig, RemoteParams, ServerDescriptor, StdioParams, TransportKind,
    TransportParams, ValidatedConfig,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

type Entry = Map<String, Value>;

/// Validate the entire MCP configuration.
pub fn validate_config(raw: &Value) -> Result<ValidatedConfig, ConfigError> {
    if !raw.is_object() {
        return Err(ConfigError::InvalidShape {
            reason: "configuration must be a JSON object".to_string(),
        });
    }
    if !raw.get("mcpServers").is_some_and(Value::is_object) {
        return Err(ConfigError::InvalidShape {
            reason: "'mcpServers' must be an object mapping server names to server configs".to_string(),
        });
    }
    let config: McpConfig = serde_json::from_value(raw.clone()).map_err(|error| ConfigError::InvalidShape {
        reason: error.to_string(),
    })?;

    let mut servers = IndexMap::with_capacity(config.mcp_servers.len());
    for (name, entry) in &config.mcp_servers {
        let descriptor = validate_server(name, entry)?;
        debug!("Validated server configuration: {}", name);
        servers.insert(name.clone(), descriptor);
    }
    Ok(ValidatedConfig::from_servers(servers))
}

/// Validate a server name.
pub fn validate_server_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidServerName {
            name: name.to_string(),
            reason: "Server name cannot be empty".to_string(),
        });
    }

    if name.chars().any(char::is_control) {
        return Err(ConfigError::InvalidServerName {
            name: name.to_string(),
            reason: "Server name cannot contain control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate a single server entry into its descriptor.
pub fn validate_server(name: &str, raw: &Value) -> Result<ServerDescriptor, ConfigError> {
    validate_server_name(name)?;
    let entry = raw
        .as_object()
        .ok_or_else(|| ConfigError::InvalidEntry {
            server: name.to_string(),
            reason: "server entry must be an object".to_string(),
        })?;

    let transport = match entry.get("transport") {
        Some(Value::String(value)) => value,
        Some(_) => return Err(ConfigError::invalid_field(name, "transport", "must be a string")),
        None => {
            return Err(ConfigError::MissingTransport {
                server: name.to_string(),
            });
        }
    };
    let kind: TransportKind = transport.parse().map_err(|_| ConfigError::UnsupportedTransport {
        server: name.to_string(),
        value: transport.clone(),
    })?;

    let params = match kind {
        TransportKind::Stdio => TransportParams::Stdio(validate_stdio_server(name, entry)?),
        TransportKind::Sse | TransportKind::HttpStream => TransportParams::Remote(validate_remote_server(name, kind, entry)?),
    };

    // `version` is optional for every transport; absent or blank means the default.
    let protocol_version = optional_string(name, entry, "version")?
        .filter(|version| !version.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string());

    Ok(ServerDescriptor::new(name, kind, params, protocol_version))
}

/// Validate a stdio server configuration.
fn validate_stdio_server(name: &str, entry: &Entry) -> Result<StdioParams, ConfigError> {
    let command = match entry.get("command") {
        Some(Value::String(command)) if !command.trim().is_empty() => command.clone(),
        Some(Value::String(_)) => return Err(ConfigError::invalid_field(name, "command", "cannot be empty")),
        Some(_) => return Err(ConfigError::invalid_field(name, "command", "must be a string")),
        None => return Err(ConfigError::missing_field(name, "command", "stdio")),
    };

    let args = match entry.get("args") {
        None => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ConfigError::invalid_field(name, "args", "every argument must be a string"))
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(_) => return Err(ConfigError::invalid_field(name, "args", "must be an array of strings")),
    };

    let env = match entry.get("env") {
        None => None,
        Some(Value::Object(vars)) => {
            let mut env = IndexMap::with_capacity(vars.len());
            for (key, value) in vars {
                let value = value.as_str().ok_or_else(|| {
                    ConfigError::invalid_field(name, "env", format!("value of '{key}' must be a string"))
                })?;
                env.insert(key.clone(), value.to_string());
            }
            Some(env)
        }
        Some(_) => return Err(ConfigError::invalid_field(name, "env", "must be an object of string values")),
    };

    Ok(StdioParams { command, args, env })
}

/// Validate an sse or http-stream server configuration.
fn validate_remote_server(name: &str, kind: TransportKind, entry: &Entry) -> Result<RemoteParams, ConfigError> {
    let raw_url = match entry.get("url") {
        Some(Value::String(url)) => url,
        Some(_) => return Err(ConfigError::invalid_field(name, "url", "must be a string")),
        None => return Err(ConfigError::missing_field(name, "url", kind.as_str())),
    };

    let url = Url::parse(raw_url)
        .map_err(|error| ConfigError::invalid_field(name, "url", format!("'{raw_url}' is not an absolute URL: {error}")))?;

    // Ensure scheme is http or https
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::invalid_field(
            name,
            "url",
            format!("unsupported URL scheme: {scheme} (expected http/https)"),
        ));
    }

    Ok(RemoteParams { url })
}

fn optional_string(name: &str, entry: &Entry, field: &'static str) -> Result<Option<String>, ConfigError> {
    match entry.get(field) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(ConfigError::invalid_field(name, field, "must be a string")),
    }
}
