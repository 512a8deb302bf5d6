//! Error types for client construction, connection, and event dispatch.

use thiserror::Error;

use crate::config::{ConfigError, TransportKind};
use crate::types::EventKind;

/// Failure reported by a protocol client or its transport.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Handshake with '{server}' failed: {message}")]
    Handshake { server: String, message: String },

    #[error("Transport for '{server}' was already opened")]
    AlreadyOpened { server: String },

    #[error("Client '{server}' is not connected")]
    NotConnected { server: String },

    #[error("Close failed for '{server}': {message}")]
    Close { server: String, message: String },

    #[error("Connection to '{server}' was closed by the server")]
    Disconnected { server: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Create a handshake error.
    pub fn handshake(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handshake {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a close error.
    pub fn close(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Close {
            server: server.into(),
            message: message.into(),
        }
    }
}

/// A descriptor whose transport tag and parameters disagree.
#[derive(Debug, Error)]
#[error("Unsupported transport: {kind} cannot be built from {params} parameters")]
pub struct UnsupportedTransportError {
    pub kind: TransportKind,
    pub params: &'static str,
}

/// Cause of a failed client/transport pair construction.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    UnsupportedTransport(#[from] UnsupportedTransportError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Registry construction aborted on the first pair that failed to build.
#[derive(Debug, Error)]
#[error("Failed to initialize client {server}: {source}")]
pub struct InitializationError {
    pub server: String,
    #[source]
    pub source: BuildError,
}

/// Handler registration rejected before the handler table was touched.
#[derive(Debug, Error)]
pub enum InvalidHandlerError {
    #[error("Unknown event '{name}'; handler must target a recognized event kind")]
    UnknownEvent { name: String },

    #[error("Event '{kind}' must be registered through its dedicated method")]
    ReservedEvent { kind: EventKind },
}

/// One server that did not reach `Connected`.
#[derive(Debug, Error)]
#[error("[{server}] {source}")]
pub struct ConnectFailure {
    pub server: String,
    #[source]
    pub source: ClientError,
}

/// `connect()` result when at least one attempt failed. Servers absent from
/// `failures` stayed connected; nothing is rolled back.
#[derive(Debug, Error)]
#[error("Failed to connect {count} server(s): {summary}", count = .failures.len(), summary = summarize(.failures))]
pub struct ConnectError {
    pub failures: Vec<ConnectFailure>,
}

impl ConnectError {
    /// Names of the servers that failed, in registry order.
    pub fn failed_servers(&self) -> Vec<&str> {
        self.failures.iter().map(|failure| failure.server.as_str()).collect()
    }
}

fn summarize(failures: &[ConnectFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Close failure for one connection. Logged by the orchestrator, never returned.
#[derive(Debug, Error)]
#[error("Error during disconnect of '{server}': {source}")]
pub struct DisconnectError {
    pub server: String,
    #[source]
    pub source: ClientError,
}

/// A host handler returned an error or panicked. Logged, never returned.
#[derive(Debug, Error)]
#[error("[{server}] Error in user handler for {kind}: {message}")]
pub struct UserHandlerError {
    pub server: String,
    pub kind: EventKind,
    pub message: String,
}

/// Errors from building a [`crate::ClientsManager`].
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Initialization(#[from] InitializationError),
}

/// Errors surfaced by the [`crate::ClientLoader`] facade.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Failed to load clients: {source}")]
    Load {
        #[source]
        source: LoadStageError,
    },

    #[error("Clients not loaded. Call load() first.")]
    NotLoaded,

    #[error(transparent)]
    InvalidHandler(#[from] InvalidHandlerError),
}

/// The load stage that failed.
#[derive(Debug, Error)]
pub enum LoadStageError {
    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

impl From<ManagerError> for LoaderError {
    fn from(error: ManagerError) -> Self {
        LoaderError::Load { source: error.into() }
    }
}

impl From<ConnectError> for LoaderError {
    fn from(error: ConnectError) -> Self {
        LoaderError::Load { source: error.into() }
    }
}
