//! Client subsystem: protocol seam, transports, and the per-server registry.
//!
//! The orchestration code only sees [`ProtocolClient`] and [`ClientTransport`];
//! [`RmcpFactory`] supplies the rmcp-backed implementations used in
//! production.

mod connection;
mod orchestrator;
mod protocol;
mod registry;
mod rmcp_client;
mod session;
mod sse;
mod stdio;
mod transport;

pub use connection::ClientConnection;
pub use orchestrator::{ConnectionOrchestrator, fan_out};
pub use protocol::{
    ClientTransport, CloseCallback, ConnectionFactory, EndpointTarget, ErrorCallback, NotificationCallback,
    ProtocolClient, TransportEndpoint, TransportEvents,
};
pub use registry::ClientRegistry;
pub use rmcp_client::{NotificationForwarder, RmcpClient};
pub use transport::{RmcpFactory, RmcpTransport, build_transport};
