//! ClientLoader: the host-facing facade.
//!
//! `load` runs validate → build → connect and keeps the resulting manager.
//! Accessors and handler registration require a successful `load` and
//! otherwise fail with [`LoaderError::NotLoaded`].

use std::sync::Arc;

use crate::client::{ClientConnection, ClientRegistry, ConnectionFactory, RmcpFactory};
use crate::config::{ConfigSource, ManagerOptions};
use crate::logging::Diagnostics;
use crate::manager::ClientsManager;
use crate::types::{EventPayload, LoaderError, NotificationKind};

/// Loads a configuration into a connected [`ClientsManager`].
pub struct ClientLoader {
    factory: Arc<dyn ConnectionFactory>,
    options: ManagerOptions,
    manager: Option<ClientsManager>,
    /// Set only once every server connected.
    loaded: bool,
}

impl ClientLoader {
    /// Loader backed by rmcp clients with logging enabled.
    pub fn new() -> Self {
        Self::with_options(ManagerOptions::default())
    }

    pub fn with_options(options: ManagerOptions) -> Self {
        let factory = RmcpFactory::new(Diagnostics::new(options.enable_logging));
        Self::with_factory(Arc::new(factory), options)
    }

    pub fn with_factory(factory: Arc<dyn ConnectionFactory>, options: ManagerOptions) -> Self {
        Self {
            factory,
            options,
            manager: None,
            loaded: false,
        }
    }

    /// Validate, build, and connect every configured server.
    ///
    /// Any stage's failure is returned as `Failed to load clients: <cause>`.
    /// After a connect failure the partially connected manager is kept so
    /// [`disconnect`](Self::disconnect) can release it, but the loader
    /// reports itself as not loaded.
    ///
    /// A previous manager is kept untouched when the new source fails to
    /// validate or build, and is disconnected only once its replacement
    /// exists.
    pub async fn load(&mut self, source: impl Into<ConfigSource>) -> Result<&mut ClientsManager, LoaderError> {
        let manager = ClientsManager::with_factory(source, self.options, self.factory.as_ref())?;
        if let Some(mut previous) = self.manager.take() {
            previous.disconnect().await;
        }
        self.loaded = false;

        let manager = self.manager.insert(manager);
        manager.connect().await?;
        self.loaded = true;
        Ok(manager)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn manager(&self) -> Result<&ClientsManager, LoaderError> {
        match &self.manager {
            Some(manager) if self.loaded => Ok(manager),
            _ => Err(LoaderError::NotLoaded),
        }
    }

    pub fn manager_mut(&mut self) -> Result<&mut ClientsManager, LoaderError> {
        match &mut self.manager {
            Some(manager) if self.loaded => Ok(manager),
            _ => Err(LoaderError::NotLoaded),
        }
    }

    /// Every connection, keyed by server name.
    pub fn clients(&self) -> Result<&ClientRegistry, LoaderError> {
        Ok(self.manager()?.registry())
    }

    /// The connection for `name`, or `None` if no such server is configured.
    pub fn client(&self, name: &str) -> Result<Option<&ClientConnection>, LoaderError> {
        Ok(self.manager()?.connection(name))
    }

    pub fn client_mut(&mut self, name: &str) -> Result<Option<&mut ClientConnection>, LoaderError> {
        Ok(self.manager_mut()?.connection_mut(name))
    }

    /// Close every connection, including those left by a failed load. Never fails.
    pub async fn disconnect(&mut self) {
        if let Some(manager) = self.manager.as_mut() {
            manager.disconnect().await;
        }
    }

    pub fn register_notification_handler<F>(&self, kind: NotificationKind, handler: F) -> Result<(), LoaderError>
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.manager()?.set_notification_handler(kind, handler);
        Ok(())
    }

    pub fn register_error_handler<F>(&self, handler: F) -> Result<(), LoaderError>
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.manager()?.set_error_handler(handler);
        Ok(())
    }

    pub fn register_transport_close_handler<F>(&self, handler: F) -> Result<(), LoaderError>
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.manager()?.set_transport_close_handler(handler);
        Ok(())
    }

    /// Register a notification handler by event name, e.g. `"toolListChanged"`.
    ///
    /// Unknown names and the reserved `error`/`transportClose` names are
    /// rejected with [`LoaderError::InvalidHandler`] before anything changes.
    pub fn register_notification_handler_named<F>(&self, name: &str, handler: F) -> Result<NotificationKind, LoaderError>
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Ok(self.manager()?.router().register_notification_named(name, handler)?)
    }

    /// Register any handler, control signals included, by event name.
    pub fn register_handler_by_name<F>(&self, name: &str, handler: F) -> Result<(), LoaderError>
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Ok(self.manager()?.set_handler(name, handler)?)
    }
}

impl Default for ClientLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClientLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientLoader")
            .field("options", &self.options)
            .field("loaded", &self.loaded)
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}
