//! Core types for MCP client management.

pub mod errors;
pub mod events;
pub mod status;

pub use errors::{
    BuildError, ClientError, ConnectError, ConnectFailure, DisconnectError, InitializationError, InvalidHandlerError,
    LoadStageError, LoaderError, ManagerError, UnsupportedTransportError, UserHandlerError,
};
pub use events::{EventKind, EventPayload, LoggingLevel, NotificationEvent, NotificationKind};
pub use status::ConnectionState;
