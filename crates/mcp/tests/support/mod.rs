//! Scripted client/transport doubles for exercising the manager without
//! spawning processes or opening sockets.

#![allow(dead_code)]

use async_trait::async_trait;
use mcp_client_manager::client::{
    ClientTransport, CloseCallback, ConnectionFactory, EndpointTarget, ErrorCallback, NotificationCallback,
    ProtocolClient, TransportEndpoint, TransportEvents,
};
use mcp_client_manager::{ClientError, LoggingLevel, NotificationKind, ServerDescriptor, TransportKind};
use serde_json::Value;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;

/// Callbacks a fake pair received from the registry, reachable from tests.
#[derive(Default)]
struct Wiring {
    notifications: HashMap<NotificationKind, NotificationCallback>,
    client_error: Option<ErrorCallback>,
    events: Option<TransportEvents>,
}

#[derive(Default)]
struct Shared {
    fail_create: HashSet<String>,
    fail_handshake: HashSet<String>,
    fail_close: HashSet<String>,
    wirings: Mutex<HashMap<String, Wiring>>,
    log: Mutex<Vec<String>>,
    live_clients: AtomicUsize,
}

impl Shared {
    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn wiring<R>(&self, server: &str, f: impl FnOnce(&mut Wiring) -> R) -> R {
        let mut wirings = self.wirings.lock().unwrap();
        f(wirings.entry(server.to_string()).or_default())
    }
}

/// Factory whose clients succeed unless scripted otherwise.
#[derive(Clone, Default)]
pub struct FakeFactory {
    shared: Arc<Shared>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(mut self, edit: impl FnOnce(&mut Shared)) -> Self {
        let shared = Arc::get_mut(&mut self.shared).expect("script before sharing the factory");
        edit(shared);
        self
    }

    /// `create_client` fails for `server`.
    pub fn fail_create(self, server: &str) -> Self {
        self.script(|shared| {
            shared.fail_create.insert(server.to_string());
        })
    }

    /// The handshake of `server` is refused.
    pub fn fail_handshake(self, server: &str) -> Self {
        self.script(|shared| {
            shared.fail_handshake.insert(server.to_string());
        })
    }

    /// Closing the client of `server` returns an error.
    pub fn fail_close(self, server: &str) -> Self {
        self.script(|shared| {
            shared.fail_close.insert(server.to_string());
        })
    }

    /// Clients built and not yet dropped.
    pub fn live_clients(&self) -> usize {
        self.shared.live_clients.load(Ordering::SeqCst)
    }

    /// Lifecycle calls in the order they happened, e.g. `"close:alpha"`.
    pub fn log(&self) -> Vec<String> {
        self.shared.log.lock().unwrap().clone()
    }

    pub fn logged(&self, entry: &str) -> bool {
        self.log().iter().any(|line| line == entry)
    }

    /// Deliver a notification as if `server` had sent it.
    pub fn emit(&self, server: &str, kind: NotificationKind, params: Value) {
        let callback = self.shared.wiring(server, |wiring| wiring.notifications.get(&kind).cloned());
        if let Some(callback) = callback {
            callback(params);
        }
    }

    pub fn emit_client_error(&self, server: &str, error: ClientError) {
        let callback = self.shared.wiring(server, |wiring| wiring.client_error.clone());
        if let Some(callback) = callback {
            callback(error);
        }
    }

    pub fn emit_transport_error(&self, server: &str, error: ClientError) {
        let events = self.shared.wiring(server, |wiring| wiring.events.clone());
        if let Some(events) = events {
            events.report_error(error);
        }
    }

    /// Simulate the remote end dropping the transport.
    pub fn drop_transport(&self, server: &str) {
        let events = self.shared.wiring(server, |wiring| wiring.events.clone());
        if let Some(events) = events {
            events.report_close();
        }
    }
}

impl ConnectionFactory for FakeFactory {
    fn create_client(&self, name: &str, version: &str) -> Result<Box<dyn ProtocolClient>, ClientError> {
        if self.shared.fail_create.contains(name) {
            return Err(ClientError::transport(format!("scripted build failure for {name}")));
        }
        self.shared.live_clients.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeClient {
            name: name.to_string(),
            version: version.to_string(),
            level: LoggingLevel::default(),
            connected: false,
            shared: Arc::clone(&self.shared),
        }))
    }

    fn create_transport(&self, descriptor: &ServerDescriptor) -> Result<Box<dyn ClientTransport>, ClientError> {
        let events = TransportEvents::new();
        self.shared
            .wiring(descriptor.name(), |wiring| wiring.events = Some(events.clone()));
        Ok(Box::new(FakeTransport {
            server: descriptor.name().to_string(),
            kind: descriptor.transport_kind(),
            opened: false,
            events,
            shared: Arc::clone(&self.shared),
        }))
    }
}

pub struct FakeClient {
    name: String,
    version: String,
    level: LoggingLevel,
    connected: bool,
    shared: Arc<Shared>,
}

impl FakeClient {
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Drop for FakeClient {
    fn drop(&mut self) {
        self.shared.live_clients.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProtocolClient for FakeClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    async fn connect(&mut self, transport: &mut dyn ClientTransport) -> Result<(), ClientError> {
        transport.open()?;
        tokio::task::yield_now().await;
        self.shared.record(format!("connect:{}", self.name));
        if self.shared.fail_handshake.contains(&self.name) {
            return Err(ClientError::handshake(&self.name, "scripted refusal"));
        }
        self.connected = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.shared.record(format!("close:{}", self.name));
        self.connected = false;
        if self.shared.fail_close.contains(&self.name) {
            return Err(ClientError::close(&self.name, "scripted close failure"));
        }
        Ok(())
    }

    fn set_error_callback(&mut self, callback: ErrorCallback) {
        self.shared.wiring(&self.name, |wiring| wiring.client_error = Some(callback));
    }

    fn set_notification_callback(&mut self, kind: NotificationKind, callback: NotificationCallback) {
        self.shared.wiring(&self.name, |wiring| {
            wiring.notifications.insert(kind, callback);
        });
    }

    fn set_logging_level(&mut self, level: LoggingLevel) {
        self.level = level;
    }

    fn logging_level(&self) -> LoggingLevel {
        self.level
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct FakeTransport {
    server: String,
    kind: TransportKind,
    opened: bool,
    events: TransportEvents,
    shared: Arc<Shared>,
}

#[async_trait]
impl ClientTransport for FakeTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn set_error_callback(&mut self, callback: ErrorCallback) {
        self.events.set_error_callback(callback);
    }

    fn set_close_callback(&mut self, callback: CloseCallback) {
        self.events.set_close_callback(callback);
    }

    fn open(&mut self) -> Result<TransportEndpoint, ClientError> {
        if self.opened {
            return Err(ClientError::AlreadyOpened {
                server: self.server.clone(),
            });
        }
        self.opened = true;
        Ok(TransportEndpoint {
            target: EndpointTarget::Stdio(Command::new("true")),
            events: self.events.clone(),
        })
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.shared.record(format!("transport-close:{}", self.server));
        self.events.report_close();
        Ok(())
    }
}

/// Records every `(server, payload)` a handler sees.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(
        &self,
    ) -> impl Fn(&str, &mcp_client_manager::EventPayload) -> anyhow::Result<()> + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |server: &str, payload: &mcp_client_manager::EventPayload| {
            seen.lock().unwrap().push((server.to_string(), format!("{payload:?}")));
            Ok::<(), anyhow::Error>(())
        }
    }

    pub fn servers(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|(server, _)| server.clone()).collect()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|(_, payload)| payload.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

/// Poll `check` until it holds or five seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}
