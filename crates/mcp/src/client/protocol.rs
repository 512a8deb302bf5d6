//! Capabilities the manager consumes from a protocol client and its transport.
//!
//! The manager never frames messages or correlates requests itself. It only
//! needs a client that can connect over a transport, close, report errors,
//! accept per-kind notification callbacks, and take a verbosity level; and a
//! transport that can be opened once, closed, and report errors and closure.

use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::process::Command;
use url::Url;

use crate::config::{ServerDescriptor, TransportKind};
use crate::types::{ClientError, LoggingLevel, NotificationKind};

/// Receives errors raised outside the request/response flow.
pub type ErrorCallback = Arc<dyn Fn(ClientError) + Send + Sync>;
/// Fired once when a transport closes.
pub type CloseCallback = Arc<dyn Fn() + Send + Sync>;
/// Receives the params of one inbound notification.
pub type NotificationCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// A protocol client identified by name and version.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Perform the handshake over `transport`.
    async fn connect(&mut self, transport: &mut dyn ClientTransport) -> Result<(), ClientError>;

    /// Close the client session. Closing a client that never connected is a no-op.
    async fn close(&mut self) -> Result<(), ClientError>;

    fn set_error_callback(&mut self, callback: ErrorCallback);

    /// Install the callback for `kind`, replacing any previous one.
    fn set_notification_callback(&mut self, kind: NotificationKind, callback: NotificationCallback);

    /// Pin the client's own diagnostic verbosity.
    fn set_logging_level(&mut self, level: LoggingLevel);

    fn logging_level(&self) -> LoggingLevel;

    /// Escape hatch to the concrete client, e.g. [`crate::client::RmcpClient`].
    fn as_any(&self) -> &dyn Any;
}

/// A transport bound to one server.
#[async_trait]
pub trait ClientTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    fn set_error_callback(&mut self, callback: ErrorCallback);

    fn set_close_callback(&mut self, callback: CloseCallback);

    /// Hand the endpoint to the client. Succeeds at most once.
    fn open(&mut self) -> Result<TransportEndpoint, ClientError>;

    /// Release the transport and fire the close callback.
    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Builds the client/transport pair for a descriptor.
pub trait ConnectionFactory: Send + Sync {
    fn create_client(&self, name: &str, version: &str) -> Result<Box<dyn ProtocolClient>, ClientError>;

    /// Build the transport. Called only after the descriptor's tag and
    /// parameters were checked to agree.
    fn create_transport(&self, descriptor: &ServerDescriptor) -> Result<Box<dyn ClientTransport>, ClientError>;
}

/// Where and how a client reaches its server.
pub enum EndpointTarget {
    /// Subprocess to spawn.
    Stdio(Command),
    /// Event stream URL plus the HTTP client used for GET and POST.
    Sse { url: Url, http: reqwest::Client },
    /// Streamable HTTP endpoint.
    StreamableHttp { url: Url, http: reqwest::Client },
}

impl fmt::Debug for EndpointTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointTarget::Stdio(command) => f.debug_tuple("Stdio").field(&command.as_std().get_program()).finish(),
            EndpointTarget::Sse { url, .. } => f.debug_struct("Sse").field("url", &url.as_str()).finish_non_exhaustive(),
            EndpointTarget::StreamableHttp { url, .. } => f
                .debug_struct("StreamableHttp")
                .field("url", &url.as_str())
                .finish_non_exhaustive(),
        }
    }
}

/// An opened transport: its target plus the hooks to report what happens on it.
#[derive(Debug)]
pub struct TransportEndpoint {
    pub target: EndpointTarget,
    pub events: TransportEvents,
}

/// Shared error/close hooks of one transport.
///
/// Cloned into whatever task ends up driving the transport so it can report
/// failures and closure after the handshake. Close fires at most once.
#[derive(Clone, Default)]
pub struct TransportEvents {
    inner: Arc<EventsInner>,
}

#[derive(Default)]
struct EventsInner {
    on_error: RwLock<Option<ErrorCallback>>,
    on_close: RwLock<Option<CloseCallback>>,
    closed: AtomicBool,
}

impl TransportEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error_callback(&self, callback: ErrorCallback) {
        *self.inner.on_error.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub fn set_close_callback(&self, callback: CloseCallback) {
        *self.inner.on_close.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Deliver `error` to the error callback, if one is installed.
    pub fn report_error(&self, error: ClientError) {
        let callback = self.inner.on_error.read().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(callback) = callback {
            callback(error);
        }
    }

    /// Fire the close callback unless it already fired.
    pub fn report_close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let callback = self.inner.on_close.read().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TransportEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportEvents").field("closed", &self.is_closed()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn close_fires_once() {
        let events = TransportEvents::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        events.set_close_callback(Arc::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        events.report_close();
        events.clone().report_close();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(events.is_closed());
    }

    #[test]
    fn errors_without_callback_are_dropped() {
        let events = TransportEvents::new();
        events.report_error(ClientError::transport("nobody listening"));

        let received = Arc::new(RwLock::new(Vec::new()));
        let sink = Arc::clone(&received);
        events.set_error_callback(Arc::new(move |error: ClientError| {
            sink.write().unwrap().push(error.to_string());
        }));
        events.report_error(ClientError::transport("boom"));
        assert_eq!(received.read().unwrap().as_slice(), ["Transport error: boom"]);
    }
}
