//! ClientRegistry: one wired client/transport pair per configured server.

use indexmap::IndexMap;

use crate::client::connection::ClientConnection;
use crate::client::protocol::ConnectionFactory;
use crate::client::transport::build_transport;
use crate::config::{ServerDescriptor, ValidatedConfig};
use crate::router::NotificationRouter;
use crate::types::{BuildError, InitializationError, LoggingLevel, NotificationKind};

/// Every connection of a manager, keyed by server name in descriptor order.
///
/// Built once before any connection activity; the key set never changes
/// afterwards.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    connections: IndexMap<String, ClientConnection>,
}

impl ClientRegistry {
    /// Build and wire a pair for every descriptor.
    ///
    /// All or nothing: on the first pair that fails to build, everything
    /// built so far is dropped (none of it was connected) and the failing
    /// server is named in the error.
    pub fn build(
        config: &ValidatedConfig,
        factory: &dyn ConnectionFactory,
        router: &NotificationRouter,
    ) -> Result<Self, InitializationError> {
        let mut connections = IndexMap::with_capacity(config.len());
        for descriptor in config.descriptors() {
            let connection = build_connection(descriptor, factory, router).map_err(|source| InitializationError {
                server: descriptor.name().to_string(),
                source,
            })?;
            connections.insert(descriptor.name().to_string(), connection);
        }
        Ok(Self { connections })
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ClientConnection> {
        self.connections.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClientConnection> {
        self.connections.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientConnection> {
        self.connections.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClientConnection> {
        self.connections.values_mut()
    }
}

fn build_connection(
    descriptor: &ServerDescriptor,
    factory: &dyn ConnectionFactory,
    router: &NotificationRouter,
) -> Result<ClientConnection, BuildError> {
    let name = descriptor.name();
    let mut client = factory.create_client(name, descriptor.protocol_version())?;
    // The manager decides what gets surfaced, not the client.
    client.set_logging_level(LoggingLevel::Critical);

    let mut transport = build_transport(factory, descriptor)?;

    client.set_error_callback(router.client_error_callback(name));
    transport.set_error_callback(router.transport_error_callback(name));
    transport.set_close_callback(router.transport_close_callback(name));
    for kind in NotificationKind::ALL {
        client.set_notification_callback(kind, router.notification_callback(kind, name));
    }

    Ok(ClientConnection::new(descriptor.clone(), client, transport))
}
