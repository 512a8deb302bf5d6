//! Event kinds and payloads routed from protocol clients to host handlers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::types::{ClientError, InvalidHandlerError};

/// Asynchronous notifications a protocol client may deliver outside the
/// request/response flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Cancelled,
    Progress,
    Initialized,
    RootsListChanged,
    ResourceListChanged,
    ResourceUpdated,
    ToolListChanged,
    LoggingMessage,
    PromptListChanged,
}

impl NotificationKind {
    /// Every recognized notification kind, in wiring order.
    pub const ALL: [NotificationKind; 9] = [
        NotificationKind::Cancelled,
        NotificationKind::Progress,
        NotificationKind::Initialized,
        NotificationKind::RootsListChanged,
        NotificationKind::ResourceListChanged,
        NotificationKind::ResourceUpdated,
        NotificationKind::ToolListChanged,
        NotificationKind::LoggingMessage,
        NotificationKind::PromptListChanged,
    ];

    /// Host-facing event name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Cancelled => "cancelled",
            NotificationKind::Progress => "progress",
            NotificationKind::Initialized => "initialized",
            NotificationKind::RootsListChanged => "rootsListChanged",
            NotificationKind::ResourceListChanged => "resourceListChanged",
            NotificationKind::ResourceUpdated => "resourceUpdated",
            NotificationKind::ToolListChanged => "toolListChanged",
            NotificationKind::LoggingMessage => "loggingMessage",
            NotificationKind::PromptListChanged => "promptListChanged",
        }
    }

    /// JSON-RPC method carried by this notification on the wire.
    pub fn method(&self) -> &'static str {
        match self {
            NotificationKind::Cancelled => "notifications/cancelled",
            NotificationKind::Progress => "notifications/progress",
            NotificationKind::Initialized => "notifications/initialized",
            NotificationKind::RootsListChanged => "notifications/roots/list_changed",
            NotificationKind::ResourceListChanged => "notifications/resources/list_changed",
            NotificationKind::ResourceUpdated => "notifications/resources/updated",
            NotificationKind::ToolListChanged => "notifications/tools/list_changed",
            NotificationKind::LoggingMessage => "notifications/message",
            NotificationKind::PromptListChanged => "notifications/prompts/list_changed",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of the handler table: the nine notifications plus two control signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Notification(NotificationKind),
    /// Client or transport error.
    Error,
    /// Transport closed.
    TransportClose,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Notification(kind) => kind.as_str(),
            EventKind::Error => "error",
            EventKind::TransportClose => "transportClose",
        }
    }
}

impl From<NotificationKind> for EventKind {
    fn from(kind: NotificationKind) -> Self {
        EventKind::Notification(kind)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = InvalidHandlerError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "error" => Ok(EventKind::Error),
            "transportClose" => Ok(EventKind::TransportClose),
            other => NotificationKind::ALL
                .into_iter()
                .find(|kind| kind.as_str() == other)
                .map(EventKind::Notification)
                .ok_or_else(|| InvalidHandlerError::UnknownEvent { name: other.to_string() }),
        }
    }
}

/// Data handed to a host handler alongside the server name.
#[derive(Debug)]
pub enum EventPayload {
    /// Raw notification params as delivered by the protocol client.
    Notification(Value),
    /// Error raised by a client or its transport.
    Error(ClientError),
    /// Transport close carries no data.
    Closed,
}

impl EventPayload {
    /// Notification params, if this payload carries any.
    pub fn as_notification(&self) -> Option<&Value> {
        match self {
            EventPayload::Notification(value) => Some(value),
            _ => None,
        }
    }

    /// The reported error, if this payload carries one.
    pub fn as_error(&self) -> Option<&ClientError> {
        match self {
            EventPayload::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// One inbound event on its way to a handler. Built per dispatch and dropped after.
#[derive(Debug)]
pub struct NotificationEvent<'a> {
    pub kind: EventKind,
    pub server_name: &'a str,
    pub payload: EventPayload,
}

/// MCP logging levels, least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Debug,
    #[default]
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LoggingLevel {
    /// Whether a diagnostic at `level` passes a filter pinned to `self`.
    pub fn allows(&self, level: LoggingLevel) -> bool {
        level >= *self
    }
}
