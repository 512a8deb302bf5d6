//! Transport construction: descriptor → transport handle.

use async_trait::async_trait;

use crate::client::protocol::{
    ClientTransport, CloseCallback, ConnectionFactory, EndpointTarget, ErrorCallback, ProtocolClient,
    TransportEndpoint, TransportEvents,
};
use crate::client::rmcp_client::RmcpClient;
use crate::client::stdio::build_stdio_command;
use crate::config::{ServerDescriptor, TransportKind, TransportParams};
use crate::logging::Diagnostics;
use crate::types::{BuildError, ClientError, UnsupportedTransportError};

/// Build the transport for `descriptor` through `factory`.
///
/// Rejects a descriptor whose transport tag disagrees with its parameter
/// shape. Validation never produces one, so this only fires if a
/// descriptor was assembled by hand.
pub fn build_transport(
    factory: &dyn ConnectionFactory,
    descriptor: &ServerDescriptor,
) -> Result<Box<dyn ClientTransport>, BuildError> {
    let params = descriptor.transport_params();
    let matches = match descriptor.transport_kind() {
        TransportKind::Stdio => matches!(params, TransportParams::Stdio(_)),
        TransportKind::Sse | TransportKind::HttpStream => matches!(params, TransportParams::Remote(_)),
    };
    if !matches {
        return Err(UnsupportedTransportError {
            kind: descriptor.transport_kind(),
            params: params.shape(),
        }
        .into());
    }
    Ok(factory.create_transport(descriptor)?)
}

/// Transport handle backed by a not-yet-started endpoint.
///
/// Nothing touches the network or spawns a process until the client opens
/// the endpoint during `connect`.
#[derive(Debug)]
pub struct RmcpTransport {
    server: String,
    kind: TransportKind,
    target: Option<EndpointTarget>,
    events: TransportEvents,
}

impl RmcpTransport {
    pub fn new(server: impl Into<String>, kind: TransportKind, target: EndpointTarget) -> Self {
        Self {
            server: server.into(),
            kind,
            target: Some(target),
            events: TransportEvents::new(),
        }
    }

    pub fn is_opened(&self) -> bool {
        self.target.is_none()
    }
}

#[async_trait]
impl ClientTransport for RmcpTransport {
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
        let target = self.target.take().ok_or_else(|| ClientError::AlreadyOpened {
            server: self.server.clone(),
        })?;
        Ok(TransportEndpoint {
            target,
            events: self.events.clone(),
        })
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        // Dropping an unopened stdio command never spawned anything.
        self.target = None;
        self.events.report_close();
        Ok(())
    }
}

/// Default factory: rmcp clients over stdio, SSE, or streamable HTTP.
#[derive(Debug, Clone)]
pub struct RmcpFactory {
    http: reqwest::Client,
    diagnostics: Diagnostics,
}

impl RmcpFactory {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self::with_http_client(reqwest::Client::new(), diagnostics)
    }

    /// Use a preconfigured HTTP client for SSE and streamable HTTP servers.
    pub fn with_http_client(http: reqwest::Client, diagnostics: Diagnostics) -> Self {
        Self { http, diagnostics }
    }
}

impl Default for RmcpFactory {
    fn default() -> Self {
        Self::new(Diagnostics::default())
    }
}

impl ConnectionFactory for RmcpFactory {
    fn create_client(&self, name: &str, version: &str) -> Result<Box<dyn ProtocolClient>, ClientError> {
        Ok(Box::new(RmcpClient::new(name, version, self.diagnostics)))
    }

    fn create_transport(&self, descriptor: &ServerDescriptor) -> Result<Box<dyn ClientTransport>, ClientError> {
        let target = match (descriptor.transport_kind(), descriptor.transport_params()) {
            (TransportKind::Stdio, TransportParams::Stdio(params)) => EndpointTarget::Stdio(build_stdio_command(params)),
            (TransportKind::Sse, TransportParams::Remote(params)) => EndpointTarget::Sse {
                url: params.url.clone(),
                http: self.http.clone(),
            },
            (TransportKind::HttpStream, TransportParams::Remote(params)) => EndpointTarget::StreamableHttp {
                url: params.url.clone(),
                http: self.http.clone(),
            },
            (kind, params) => {
                return Err(ClientError::transport(format!(
                    "{kind} transport cannot use {} parameters",
                    params.shape()
                )));
            }
        };
        Ok(Box::new(RmcpTransport::new(
            descriptor.name(),
            descriptor.transport_kind(),
            target,
        )))
    }
}
