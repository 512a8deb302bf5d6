//! Configuration management for MCP clients.
//! This module handles reading, decoding, and validation of the
//! `mcpServers` configuration into immutable server descriptors.

mod io;
mod model;
mod validation;

pub use io::{load_config, load_config_from_path, read_config};
pub use model::{
    ConfigError, ConfigSource, DEFAULT_PROTOCOL_VERSION, ManagerOptions, McpConfig, RemoteParams, ServerDescriptor,
    StdioParams, TransportKind, TransportParams, UnknownTransport, ValidatedConfig,
};
pub use validation::{validate_config, validate_server, validate_server_name};
