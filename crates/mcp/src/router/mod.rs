//! Notification routing from protocol clients to host handlers.
//!
//! Every client's notification, error and close callbacks funnel into
//! [`NotificationRouter::dispatch`], keyed by event kind and server name.
//! Handler failures stop at the dispatch boundary: they are logged and
//! never reach the protocol client or any other handler.

mod handlers;

pub use handlers::{EventHandler, HandlerRegistry};

use serde_json::Value;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use crate::client::{CloseCallback, ErrorCallback, NotificationCallback};
use crate::logging::Diagnostics;
use crate::types::{ClientError, EventKind, EventPayload, InvalidHandlerError, NotificationEvent, NotificationKind, UserHandlerError};

/// Shared dispatch path. Clones share one handler table.
#[derive(Clone)]
pub struct NotificationRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    handlers: RwLock<HandlerRegistry>,
    diagnostics: Diagnostics,
}

impl NotificationRouter {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                handlers: RwLock::new(HandlerRegistry::new()),
                diagnostics,
            }),
        }
    }

    /// Install `handler` for `kind`, replacing any earlier one.
    pub fn register<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, Arc::new(handler));
    }

    /// Install a handler by event name (`"progress"`, `"error"`, `"transportClose"`, ...).
    ///
    /// Unknown names are rejected before the table is touched.
    pub fn register_named<F>(&self, name: &str, handler: F) -> Result<(), InvalidHandlerError>
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let kind: EventKind = name.parse()?;
        self.register(kind, handler);
        Ok(())
    }

    /// Like [`register_named`](Self::register_named) but only for the nine
    /// notification kinds; `error` and `transportClose` have their own entry points.
    pub fn register_notification_named<F>(&self, name: &str, handler: F) -> Result<NotificationKind, InvalidHandlerError>
    where
        F: Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        match name.parse::<EventKind>()? {
            EventKind::Notification(kind) => {
                self.register(EventKind::Notification(kind), handler);
                Ok(kind)
            }
            reserved => Err(InvalidHandlerError::ReservedEvent { kind: reserved }),
        }
    }

    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(kind)
    }

    /// Deliver one event to the handler registered for `kind`, if any.
    ///
    /// Never fails: an error or panic from the handler becomes a logged
    /// [`UserHandlerError`].
    pub fn dispatch(&self, kind: EventKind, server_name: &str, payload: EventPayload) {
        let event = NotificationEvent {
            kind,
            server_name,
            payload,
        };
        // Clone the slot out so a handler may re-register without deadlocking.
        let handler = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event.kind)
            .cloned();
        let Some(handler) = handler else {
            return;
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| handler(event.server_name, &event.payload)));
        let message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => format!("{error:#}"),
            Err(panic) => panic_message(panic.as_ref()),
        };
        let error = UserHandlerError {
            server: event.server_name.to_string(),
            kind: event.kind,
            message,
        };
        self.inner
            .diagnostics
            .error(event.server_name, "Handler failed", &error);
    }

    /// Callback that routes one notification kind of `server_name`.
    pub fn notification_callback(&self, kind: NotificationKind, server_name: &str) -> NotificationCallback {
        let router = self.clone();
        let server = server_name.to_string();
        Arc::new(move |params: Value| router.dispatch(kind.into(), &server, EventPayload::Notification(params)))
    }

    /// Callback for errors raised by the protocol client of `server_name`.
    pub fn client_error_callback(&self, server_name: &str) -> ErrorCallback {
        self.error_callback(server_name, "Client error")
    }

    /// Callback for errors raised by the transport of `server_name`.
    pub fn transport_error_callback(&self, server_name: &str) -> ErrorCallback {
        self.error_callback(server_name, "Transport error")
    }

    pub fn transport_close_callback(&self, server_name: &str) -> CloseCallback {
        let router = self.clone();
        let server = server_name.to_string();
        Arc::new(move || {
            router.inner.diagnostics.info(&server, "Transport closed");
            router.dispatch(EventKind::TransportClose, &server, EventPayload::Closed);
        })
    }

    fn error_callback(&self, server_name: &str, label: &'static str) -> ErrorCallback {
        let router = self.clone();
        let server = server_name.to_string();
        Arc::new(move |error: ClientError| {
            router.inner.diagnostics.error(&server, label, &error);
            router.dispatch(EventKind::Error, &server, EventPayload::Error(error));
        })
    }
}

impl std::fmt::Debug for NotificationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.inner.handlers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("NotificationRouter").field("handlers", &*handlers).finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |server: &str, payload: &EventPayload| {
            sink.lock().unwrap().push(format!("{server}:{payload:?}"));
            Ok::<(), anyhow::Error>(())
        };
        (seen, handler)
    }

    #[test]
    fn dispatch_reaches_registered_handler_with_server_name() {
        let router = NotificationRouter::new(Diagnostics::disabled());
        let (seen, handler) = recorder();
        router.register(NotificationKind::Progress.into(), handler);

        router.notification_callback(NotificationKind::Progress, "alpha")(json!({"progress": 1}));
        router.notification_callback(NotificationKind::ToolListChanged, "alpha")(json!(null));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("alpha:Notification"));
    }

    #[test]
    fn failing_handlers_do_not_block_other_kinds() {
        let router = NotificationRouter::new(Diagnostics::disabled());
        router.register(NotificationKind::Progress.into(), |_, _| anyhow::bail!("boom"));
        router.register(NotificationKind::Cancelled.into(), |_, _| panic!("kaboom"));
        let (seen, handler) = recorder();
        router.register(NotificationKind::ToolListChanged.into(), handler);

        router.dispatch(NotificationKind::Progress.into(), "s", EventPayload::Notification(json!({})));
        router.dispatch(NotificationKind::Cancelled.into(), "s", EventPayload::Notification(json!({})));
        router.dispatch(NotificationKind::ToolListChanged.into(), "s", EventPayload::Notification(json!(null)));

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn re_registration_replaces_prior_handler() {
        let router = NotificationRouter::new(Diagnostics::disabled());
        let (first, first_handler) = recorder();
        let (second, second_handler) = recorder();
        router.register(EventKind::TransportClose, first_handler);
        router.register(EventKind::TransportClose, second_handler);

        router.transport_close_callback("beta")();

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().as_slice(), ["beta:Closed"]);
    }

    #[test]
    fn error_callbacks_carry_the_error() {
        let router = NotificationRouter::new(Diagnostics::disabled());
        let (seen, handler) = recorder();
        router.register(EventKind::Error, handler);

        router.client_error_callback("gamma")(ClientError::transport("pipe closed"));
        router.transport_error_callback("gamma")(ClientError::transport("reset"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|line| line.starts_with("gamma:Error")));
    }

    #[test]
    fn unknown_names_are_rejected_before_mutation() {
        let router = NotificationRouter::new(Diagnostics::disabled());
        let err = router.register_named("toolsChanged", |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, InvalidHandlerError::UnknownEvent { .. }));

        let err = router.register_notification_named("error", |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, InvalidHandlerError::ReservedEvent { kind: EventKind::Error }));
        assert!(!router.has_handler(EventKind::Error));

        router.register_named("transportClose", |_, _| Ok(())).unwrap();
        assert!(router.has_handler(EventKind::TransportClose));
        let kind = router.register_notification_named("promptListChanged", |_, _| Ok(())).unwrap();
        assert_eq!(kind, NotificationKind::PromptListChanged);
    }

    #[test]
    fn handler_may_re_register_during_dispatch() {
        let router = NotificationRouter::new(Diagnostics::disabled());
        let inner = router.clone();
        router.register(EventKind::Error, move |_, _| {
            inner.register(EventKind::Error, |_, _| Ok(()));
            Ok(())
        });
        router.dispatch(EventKind::Error, "s", EventPayload::Error(ClientError::transport("x")));
        assert!(router.has_handler(EventKind::Error));
    }
}
