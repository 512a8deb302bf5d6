//! One managed server: its descriptor, client, transport, and lifecycle state.

use std::fmt;

use crate::client::protocol::{ClientTransport, ProtocolClient};
use crate::config::{ServerDescriptor, TransportKind};
use crate::types::{ClientError, ConnectionState};

/// Client/transport pair owned by exactly one server entry.
///
/// State changes only through the orchestrator's `connect`/`close` calls.
pub struct ClientConnection {
    descriptor: ServerDescriptor,
    client: Box<dyn ProtocolClient>,
    transport: Box<dyn ClientTransport>,
    state: ConnectionState,
}

impl ClientConnection {
    pub(crate) fn new(
        descriptor: ServerDescriptor,
        client: Box<dyn ProtocolClient>,
        transport: Box<dyn ClientTransport>,
    ) -> Self {
        Self {
            descriptor,
            client,
            transport,
            state: ConnectionState::Created,
        }
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn descriptor(&self) -> &ServerDescriptor {
        &self.descriptor
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn client(&self) -> &dyn ProtocolClient {
        self.client.as_ref()
    }

    pub fn client_mut(&mut self) -> &mut dyn ProtocolClient {
        self.client.as_mut()
    }

    /// Downcast the client to its concrete type, e.g. `RmcpClient`.
    pub fn client_as<T: 'static>(&self) -> Option<&T> {
        self.client.as_any().downcast_ref::<T>()
    }

    /// Run the handshake. `Created -> Connecting -> Connected | Failed`.
    pub(crate) async fn connect(&mut self) -> Result<(), ClientError> {
        self.state = ConnectionState::Connecting;
        match self.client.connect(self.transport.as_mut()).await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(error) => {
                self.state = ConnectionState::Failed;
                Err(error)
            }
        }
    }

    /// Close the client, then the transport. Both are attempted; the first
    /// failure is returned. A failed connection stays `Failed`.
    pub(crate) async fn close(&mut self) -> Result<(), ClientError> {
        let client_closed = self.client.close().await;
        let transport_closed = self.transport.close().await;
        if self.state.can_transition_to(ConnectionState::Closed) {
            self.state = ConnectionState::Closed;
        }
        client_closed.and(transport_closed)
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("name", &self.name())
            .field("transport", &self.transport_kind())
            .field("version", &self.client.version())
            .field("state", &self.state)
            .finish()
    }
}
