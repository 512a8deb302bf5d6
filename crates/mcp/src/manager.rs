//! ClientsManager: validated config, wired registry, router, and orchestrator.
//!
//! Construction covers the two synchronous phases (validate, build). Network
//! and process activity starts only with [`ClientsManager::connect`], so
//! handlers may be registered in between.

use crate::client::{
    ClientConnection, ClientRegistry, ConnectionFactory, ConnectionOrchestrator, RmcpFactory,
};
use crate::config::{ConfigSource, ManagerOptions, ServerDescriptor, ValidatedConfig, load_config};
use crate::logging::Diagnostics;
use crate::router::NotificationRouter;
use crate::types::{ConnectError, EventKind, EventPayload, InvalidHandlerError, ManagerError, NotificationKind};

/// Owns every connection of one configuration and the host handler table.
#[derive(Debug)]
pub struct ClientsManager {
    config: ValidatedConfig,
    registry: ClientRegistry,
    router: NotificationRouter,
    orchestrator: ConnectionOrchestrator,
}

impl ClientsManager {
    /// Validate `source` and build one rmcp-backed pair per server.
    pub fn new(source: impl Into<ConfigSource>, options: ManagerOptions) -> Result<Self, ManagerError> {
        let factory = RmcpFactory::new(Diagnostics::new(options.enable_logging));
        Self::with_factory(source, options, &factory)
    }

    /// Like [`new`](Self::new) with a caller-supplied client/transport factory.
    pub fn with_factory(
        source: impl Into<ConfigSource>,
        options: ManagerOptions,
        factory: &dyn ConnectionFactory,
    ) -> Result<Self, ManagerError> {
        let diagnostics = Diagnostics::new(options.enable_logging);
        let config = load_config(&source.into())?;
        let router = NotificationRouter::new(diagnostics);
        let registry = ClientRegistry::build(&config, factory, &router)?;
        Ok(Self {
            config,
            registry,
            router,
            orchestrator: ConnectionOrchestrator::new(diagnostics),
        })
    }

    /// Connect every server not yet attempted. See [`ConnectionOrchestrator::connect`]
    /// for the no-rollback failure semantics.
    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        self.orchestrator.connect(&mut self.registry).await
    }

    /// Best-effort close of every connection. Never fails.
    pub async fn disconnect(&mut self) {
        self.orchestrator.disconnect(&mut self.registry).await;
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn connections(&self) -> impl Iterator<Item = &ClientConnection> {
        self.registry.iter()
    }

    pub fn connection(&self, name: &str) -> Option<&ClientConnection> {
        self.registry.get(name)
    }

    pub fn connection_mut(&mut self, name: &str) -> Option<&mut ClientConnection> {
        self.registry.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.names()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ServerDescriptor> {
        self.config.descriptors()
    }

    pub fn router(&self) -> &NotificationRouter {
        &self.router
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn set_notification_handler<F>(&self, kind: NotificationKind, handler: F)
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.router.register(kind.into(), handler);
    }

    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.router.register(EventKind::Error, handler);
    }

    pub fn set_transport_close_handler<F>(&self, handler: F)
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.router.register(EventKind::TransportClose, handler);
    }

    /// Register by event name; see [`NotificationRouter::register_named`].
    pub fn set_handler<F>(&self, name: &str, handler: F) -> Result<(), InvalidHandlerError>
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.router.register_named(name, handler)
    }
}
