//! RmcpClient: protocol client backed by rmcp.

use async_trait::async_trait;
use rmcp::{
    ClientHandler, RoleClient, ServiceExt as _,
    model::{
        CancelledNotificationParam, ClientInfo, InitializeResult, LoggingMessageNotificationParam,
        ProgressNotificationParam, ResourceUpdatedNotificationParam,
    },
    service::{NotificationContext, Peer, RunningService},
    transport::{StreamableHttpClientTransport, TokioChildProcess, streamable_http_client::StreamableHttpClientTransportConfig},
};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::future::{Future, ready};
use std::process::Stdio;
use std::sync::{Arc, PoisonError, RwLock};

use super::protocol::{
    ClientTransport, EndpointTarget, ErrorCallback, NotificationCallback, ProtocolClient, TransportEvents,
};
use super::session::{SessionWatch, watch_transport};
use super::sse::connect_sse;
use super::stdio::spawn_stderr_logger;
use crate::logging::Diagnostics;
use crate::types::{ClientError, LoggingLevel, NotificationKind};

/// Callbacks shared between the client and the handler running inside rmcp.
#[derive(Default)]
struct Hooks {
    notifications: RwLock<HashMap<NotificationKind, NotificationCallback>>,
    on_error: RwLock<Option<ErrorCallback>>,
}

impl Hooks {
    fn report_error(&self, error: ClientError) {
        let callback = self.on_error.read().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(callback) = callback {
            callback(error);
        }
    }

    /// Late-bound view of the error callback, for reporting from the session.
    fn error_sink(self: &Arc<Self>) -> ErrorCallback {
        let hooks = Arc::clone(self);
        Arc::new(move |error: ClientError| hooks.report_error(error))
    }
}

/// rmcp client handler that forwards server notifications to the registered callbacks.
#[derive(Clone)]
pub struct NotificationForwarder {
    info: ClientInfo,
    hooks: Arc<Hooks>,
}

impl NotificationForwarder {
    fn forward<P: Serialize>(&self, kind: NotificationKind, params: Option<P>) {
        let callback = self
            .hooks
            .notifications
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned();
        if let Some(callback) = callback {
            match params.map(serde_json::to_value).transpose() {
                Ok(payload) => callback(payload.unwrap_or(Value::Null)),
                Err(error) => self
                    .hooks
                    .report_error(ClientError::transport(format!("could not encode {kind} params: {error}"))),
            }
        }
    }
}

impl std::fmt::Debug for NotificationForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationForwarder")
            .field("client", &self.info.client_info.name)
            .finish_non_exhaustive()
    }
}

impl ClientHandler for NotificationForwarder {
    fn get_info(&self) -> ClientInfo {
        self.info.clone()
    }

    fn on_cancelled(
        &self,
        params: CancelledNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        self.forward(NotificationKind::Cancelled, Some(params));
        ready(())
    }

    fn on_progress(
        &self,
        params: ProgressNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        self.forward(NotificationKind::Progress, Some(params));
        ready(())
    }

    fn on_logging_message(
        &self,
        params: LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        self.forward(NotificationKind::LoggingMessage, Some(params));
        ready(())
    }

    fn on_resource_updated(
        &self,
        params: ResourceUpdatedNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        self.forward(NotificationKind::ResourceUpdated, Some(params));
        ready(())
    }

    fn on_resource_list_changed(&self, _context: NotificationContext<RoleClient>) -> impl Future<Output = ()> + Send + '_ {
        self.forward(NotificationKind::ResourceListChanged, None::<()>);
        ready(())
    }

    fn on_tool_list_changed(&self, _context: NotificationContext<RoleClient>) -> impl Future<Output = ()> + Send + '_ {
        self.forward(NotificationKind::ToolListChanged, None::<()>);
        ready(())
    }

    fn on_prompt_list_changed(&self, _context: NotificationContext<RoleClient>) -> impl Future<Output = ()> + Send + '_ {
        self.forward(NotificationKind::PromptListChanged, None::<()>);
        ready(())
    }
}

/// rmcp-backed protocol client for one server.
pub struct RmcpClient {
    /// Server name the client is bound to.
    name: String,
    /// Protocol version advertised during the handshake.
    version: String,
    level: LoggingLevel,
    diagnostics: Diagnostics,
    hooks: Arc<Hooks>,
    /// Underlying rmcp running service when connected.
    service: Option<RunningService<RoleClient, NotificationForwarder>>,
    session: Option<SessionWatch>,
}

impl RmcpClient {
    pub fn new(name: impl Into<String>, version: impl Into<String>, diagnostics: Diagnostics) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            level: LoggingLevel::default(),
            diagnostics,
            hooks: Arc::new(Hooks::default()),
            service: None,
            session: None,
        }
    }

    /// True while the session is up; false once either side closed it.
    pub fn is_connected(&self) -> bool {
        self.service.is_some() && self.session.as_ref().is_some_and(SessionWatch::is_live)
    }

    /// Request handle for issuing MCP calls, once connected.
    pub fn peer(&self) -> Option<&Peer<RoleClient>> {
        self.service.as_ref().map(|service| service.peer())
    }

    /// Latest result of the Initialize handshake, if any.
    pub fn peer_info(&self) -> Option<&InitializeResult> {
        self.service.as_ref().and_then(|service| service.peer_info())
    }

    fn handler(&self) -> NotificationForwarder {
        let mut info = ClientInfo::default();
        info.client_info.name = self.name.clone();
        info.client_info.version = self.version.clone();
        NotificationForwarder {
            info,
            hooks: Arc::clone(&self.hooks),
        }
    }

    fn log(&self, level: LoggingLevel, message: &str) {
        if !self.level.allows(level) {
            return;
        }
        match level {
            LoggingLevel::Debug => self.diagnostics.debug(&self.name, message),
            LoggingLevel::Info | LoggingLevel::Notice => self.diagnostics.info(&self.name, message),
            _ => self.diagnostics.warn(&self.name, message),
        }
    }

    fn handshake_error(&self, error: impl std::fmt::Display) -> ClientError {
        ClientError::handshake(&self.name, error.to_string())
    }

    async fn serve_target(
        &self,
        target: EndpointTarget,
        events: &TransportEvents,
        session: SessionWatch,
    ) -> Result<RunningService<RoleClient, NotificationForwarder>, ClientError> {
        let handler = self.handler();
        match target {
            EndpointTarget::Stdio(command) => {
                // Only pipe stderr when someone will read it.
                let stderr = if self.level.allows(LoggingLevel::Debug) {
                    Stdio::piped()
                } else {
                    Stdio::null()
                };
                let (transport, stderr_opt) = TokioChildProcess::builder(command)
                    .stderr(stderr)
                    .spawn()
                    .map_err(|error| ClientError::transport(format!("failed to spawn '{}': {error}", self.name)))?;
                if let Some(stderr) = stderr_opt {
                    spawn_stderr_logger(self.name.clone(), self.diagnostics, stderr);
                }
                handler
                    .serve(watch_transport(transport, session))
                    .await
                    .map_err(|error| self.handshake_error(error))
            }
            EndpointTarget::Sse { url, http } => {
                let transport = connect_sse(http, url, events.clone()).await?;
                handler
                    .serve(watch_transport(transport, session))
                    .await
                    .map_err(|error| self.handshake_error(error))
            }
            EndpointTarget::StreamableHttp { url, http } => {
                let config = StreamableHttpClientTransportConfig::with_uri(url.to_string());
                let transport = StreamableHttpClientTransport::with_client(http, config);
                handler
                    .serve(watch_transport(transport, session))
                    .await
                    .map_err(|error| self.handshake_error(error))
            }
        }
    }
}

impl std::fmt::Debug for RmcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RmcpClient")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("level", &self.level)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProtocolClient for RmcpClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    async fn connect(&mut self, transport: &mut dyn ClientTransport) -> Result<(), ClientError> {
        let endpoint = transport.open()?;
        self.log(LoggingLevel::Debug, &format!("connecting over {:?}", endpoint.target));
        let session = SessionWatch::new(&self.name, endpoint.events.clone(), self.hooks.error_sink());
        let service = self
            .serve_target(endpoint.target, &endpoint.events, session.clone())
            .await?;
        self.log(LoggingLevel::Info, "connected");
        self.service = Some(service);
        session.established();
        self.session = Some(session);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        let Some(running) = self.service.take() else {
            return Ok(());
        };
        if let Some(session) = self.session.take() {
            session.closing();
        }
        running
            .cancel()
            .await
            .map_err(|error| ClientError::close(&self.name, error.to_string()))?;
        self.log(LoggingLevel::Info, "closed");
        Ok(())
    }

    fn set_error_callback(&mut self, callback: ErrorCallback) {
        *self.hooks.on_error.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn set_notification_callback(&mut self, kind: NotificationKind, callback: NotificationCallback) {
        self.hooks
            .notifications
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, callback);
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
