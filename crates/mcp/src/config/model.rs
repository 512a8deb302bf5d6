//! Data models for MCP client configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Protocol version advertised by a client whose configuration omits `version`.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.0.0";

/// Raw configuration shape: the `mcpServers` table before per-server validation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpConfig {
    /// Map of server names to unvalidated server entries.
    #[serde(rename = "mcpServers")]
    pub mcp_servers: IndexMap<String, Value>,
}

/// Where a configuration comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// A JSON file to read and decode.
    Path(PathBuf),
    /// An already decoded value.
    Value(Value),
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        ConfigSource::Path(path)
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        ConfigSource::Path(path.to_path_buf())
    }
}

impl From<Value> for ConfigSource {
    fn from(value: Value) -> Self {
        ConfigSource::Value(value)
    }
}

/// Transport tag of a server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// Local subprocess speaking over stdin/stdout.
    #[serde(rename = "stdio")]
    Stdio,
    /// Server-push event stream with POSTed requests.
    #[serde(rename = "sse")]
    Sse,
    /// Bidirectional streamable HTTP.
    #[serde(rename = "http-stream")]
    HttpStream,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Sse => "sse",
            TransportKind::HttpStream => "http-stream",
        }
    }

    /// Check if this kind reaches its server over a URL.
    pub fn is_remote(&self) -> bool {
        matches!(self, TransportKind::Sse | TransportKind::HttpStream)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `transport` value outside the recognized set.
#[derive(Debug, Error)]
#[error("unknown transport '{0}'")]
pub struct UnknownTransport(pub String);

impl FromStr for TransportKind {
    type Err = UnknownTransport;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "stdio" => Ok(TransportKind::Stdio),
            "sse" => Ok(TransportKind::Sse),
            "http-stream" => Ok(TransportKind::HttpStream),
            other => Err(UnknownTransport(other.to_string())),
        }
    }
}

/// Parameters for a stdio server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioParams {
    /// Command to execute.
    pub command: String,
    /// Arguments to pass to the command.
    pub args: Option<Vec<String>>,
    /// Environment variables to set for the process.
    pub env: Option<IndexMap<String, String>>,
}

/// Parameters for a URL-addressed server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParams {
    pub url: Url,
}

/// Transport parameters, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransportParams {
    Stdio(StdioParams),
    Remote(RemoteParams),
}

impl TransportParams {
    /// Short name of the parameter shape, for diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            TransportParams::Stdio(_) => "stdio",
            TransportParams::Remote(_) => "remote",
        }
    }
}

/// Validated, immutable description of one configured server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDescriptor {
    name: String,
    transport_kind: TransportKind,
    transport_params: TransportParams,
    protocol_version: String,
}

impl ServerDescriptor {
    /// Assemble a descriptor. The validator is the normal producer; parts are
    /// not cross-checked here, the transport factory does that.
    pub fn new(
        name: impl Into<String>,
        transport_kind: TransportKind,
        transport_params: TransportParams,
        protocol_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            transport_kind,
            transport_params,
            protocol_version: protocol_version.into(),
        }
    }

    /// Configuration key of this server.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport_kind
    }

    pub fn transport_params(&self) -> &TransportParams {
        &self.transport_params
    }

    /// Version advertised by the client, defaulted when the config omits it.
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }
}

/// The accepted configuration: one descriptor per server name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedConfig {
    servers: IndexMap<String, ServerDescriptor>,
}

impl ValidatedConfig {
    pub(crate) fn from_servers(servers: IndexMap<String, ServerDescriptor>) -> Self {
        Self { servers }
    }

    pub fn get(&self, name: &str) -> Option<&ServerDescriptor> {
        self.servers.get(name)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ServerDescriptor> {
        self.servers.values()
    }
}

/// Manager-wide options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Emit diagnostics through `tracing`. Disabling changes no return value.
    pub enable_logging: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self { enable_logging: true }
    }
}

impl ManagerOptions {
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }
}

/// Errors that can occur while reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in config file {}: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidShape { reason: String },

    #[error("Invalid server name '{name}': {reason}")]
    InvalidServerName { name: String, reason: String },

    #[error("Server '{server}': {reason}")]
    InvalidEntry { server: String, reason: String },

    #[error("Server '{server}': missing required field 'transport'")]
    MissingTransport { server: String },

    #[error("Server '{server}': missing required field '{field}' for {transport} transport")]
    MissingField {
        server: String,
        field: &'static str,
        transport: &'static str,
    },

    #[error("Server '{server}': invalid field '{field}': {reason}")]
    InvalidField {
        server: String,
        field: &'static str,
        reason: String,
    },

    #[error("Server '{server}': unsupported transport '{value}' (expected stdio, sse, or http-stream)")]
    UnsupportedTransport { server: String, value: String },
}

impl ConfigError {
    pub(crate) fn missing_field(server: &str, field: &'static str, transport: &'static str) -> Self {
        Self::MissingField {
            server: server.to_string(),
            field,
            transport,
        }
    }

    pub(crate) fn invalid_field(server: &str, field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            server: server.to_string(),
            field,
            reason: reason.into(),
        }
    }

    /// Server named by this error, if it concerns a single entry.
    pub fn server(&self) -> Option<&str> {
        match self {
            ConfigError::InvalidServerName { name, .. } => Some(name.as_str()),
            ConfigError::InvalidEntry { server, .. }
            | ConfigError::MissingTransport { server }
            | ConfigError::MissingField { server, .. }
            | ConfigError::InvalidField { server, .. }
            | ConfigError::UnsupportedTransport { server, .. } => Some(server.as_str()),
            _ => None,
        }
    }

    /// Field named by this error, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::MissingField { field, .. } | ConfigError::InvalidField { field, .. } => Some(*field),
            ConfigError::MissingTransport { .. } | ConfigError::UnsupportedTransport { .. } => Some("transport"),
            _ => None,
        }
    }
}
