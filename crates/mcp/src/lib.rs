//! Fleet manager for Model Context Protocol (MCP) clients.
//!
//! A declarative `mcpServers` configuration is validated into immutable
//! server descriptors, one client/transport pair is built per server, and
//! all pairs are connected and disconnected concurrently. Notifications,
//! errors and transport closures from every client are routed to host
//! handlers through a single dispatch path that contains handler failures.
//!
//! ```no_run
//! # async fn run() -> Result<(), mcp_client_manager::LoaderError> {
//! use mcp_client_manager::{ClientLoader, NotificationKind};
//! use serde_json::json;
//!
//! let mut loader = ClientLoader::new();
//! loader
//!     .load(json!({
//!         "mcpServers": {
//!             "files": {"transport": "stdio", "command": "node", "args": ["server.js"]}
//!         }
//!     }))
//!     .await?;
//! loader.register_notification_handler(NotificationKind::ToolListChanged, |server, _| {
//!     println!("{server} changed its tools");
//!     Ok(())
//! })?;
//! loader.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod loader;
pub mod logging;
pub mod manager;
pub mod router;
pub mod types;

pub use client::{
    ClientConnection, ClientRegistry, ClientTransport, ConnectionFactory, ConnectionOrchestrator, ProtocolClient,
    RmcpClient, RmcpFactory,
};
pub use config::{
    ConfigError, ConfigSource, DEFAULT_PROTOCOL_VERSION, ManagerOptions, ServerDescriptor, TransportKind,
    TransportParams, ValidatedConfig,
};
pub use loader::ClientLoader;
pub use manager::ClientsManager;
pub use router::{HandlerRegistry, NotificationRouter};
pub use types::{
    ClientError, ConnectError, ConnectionState, EventKind, EventPayload, InvalidHandlerError, LoaderError,
    LoggingLevel, ManagerError, NotificationKind,
};
