//! Session lifecycle of a served rmcp transport.
//!
//! Once `serve` starts, rmcp owns the transport and its service loop, so an
//! unsolicited shutdown is only visible on the transport itself.
//! [`WatchedTransport`] wraps whatever is handed to `serve` and reports what
//! it sees through a shared [`SessionWatch`]:
//!
//! - the inbound side ending while the session is live means the server went
//!   away: the client error callback receives [`ClientError::Disconnected`]
//!   and the transport close callback fires;
//! - a failed send while live goes to the transport error callback;
//! - anything during the handshake is left to `connect`, which returns it.

use rmcp::RoleClient;
use rmcp::service::{RxJsonRpcMessage, TxJsonRpcMessage};
use rmcp::transport::{IntoTransport, Transport};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::protocol::{ErrorCallback, TransportEvents};
use crate::types::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Initialize exchange in flight.
    Handshake,
    /// Inbound ended before the client marked the handshake complete.
    EndedEarly,
    Live,
    /// The client asked to close.
    Closing,
    Ended,
}

/// Shared view of one session, held by the client and its transport wrapper.
#[derive(Clone)]
pub(crate) struct SessionWatch {
    inner: Arc<WatchInner>,
}

struct WatchInner {
    server: String,
    phase: Mutex<Phase>,
    events: TransportEvents,
    client_errors: ErrorCallback,
}

impl SessionWatch {
    pub(crate) fn new(server: impl Into<String>, events: TransportEvents, client_errors: ErrorCallback) -> Self {
        Self {
            inner: Arc::new(WatchInner {
                server: server.into(),
                phase: Mutex::new(Phase::Handshake),
                events,
                client_errors,
            }),
        }
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.inner.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The handshake completed and the service loop is running.
    ///
    /// If the server already hung up in between, that is reported now.
    pub(crate) fn established(&self) {
        let ended_early = {
            let mut phase = self.phase();
            match *phase {
                Phase::Handshake => {
                    *phase = Phase::Live;
                    false
                }
                Phase::EndedEarly => {
                    *phase = Phase::Ended;
                    true
                }
                _ => false,
            }
        };
        if ended_early {
            self.report_server_close();
        }
    }

    /// The client is shutting the session down itself.
    pub(crate) fn closing(&self) {
        let mut phase = self.phase();
        if matches!(*phase, Phase::Handshake | Phase::Live) {
            *phase = Phase::Closing;
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        *self.phase() == Phase::Live
    }

    /// The transport stopped delivering messages or was closed.
    fn ended(&self) {
        let previous = {
            let mut phase = self.phase();
            let previous = *phase;
            *phase = match previous {
                Phase::Handshake | Phase::EndedEarly => Phase::EndedEarly,
                _ => Phase::Ended,
            };
            previous
        };
        match previous {
            Phase::Live => self.report_server_close(),
            Phase::Closing => self.inner.events.report_close(),
            _ => {}
        }
    }

    fn send_failed(&self, error: &dyn fmt::Display) {
        if self.is_live() {
            self.inner
                .events
                .report_error(ClientError::transport(format!("send to '{}' failed: {error}", self.inner.server)));
        }
    }

    fn report_server_close(&self) {
        (self.inner.client_errors)(ClientError::Disconnected {
            server: self.inner.server.clone(),
        });
        self.inner.events.report_close();
    }
}

impl fmt::Debug for SessionWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionWatch")
            .field("server", &self.inner.server)
            .field("phase", &*self.phase())
            .finish_non_exhaustive()
    }
}

/// rmcp transport that reports its own end of life to a [`SessionWatch`].
pub(crate) struct WatchedTransport<T> {
    inner: T,
    watch: SessionWatch,
}

/// Wrap anything rmcp accepts as a client transport.
pub(crate) fn watch_transport<T, E, A>(
    transport: T,
    watch: SessionWatch,
) -> WatchedTransport<impl Transport<RoleClient, Error = E>>
where
    T: IntoTransport<RoleClient, E, A>,
    E: std::error::Error + Send + Sync + 'static,
{
    WatchedTransport {
        inner: transport.into_transport(),
        watch,
    }
}

impl<T> Transport<RoleClient> for WatchedTransport<T>
where
    T: Transport<RoleClient>,
{
    type Error = T::Error;

    fn send(
        &mut self,
        item: TxJsonRpcMessage<RoleClient>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let sending = self.inner.send(item);
        let watch = self.watch.clone();
        async move {
            let result = sending.await;
            if let Err(error) = &result {
                watch.send_failed(error);
            }
            result
        }
    }

    fn receive(&mut self) -> impl Future<Output = Option<RxJsonRpcMessage<RoleClient>>> + Send {
        async move {
            let message = self.inner.receive().await;
            if message.is_none() {
                self.watch.ended();
            }
            message
        }
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        let result = self.inner.close().await;
        self.watch.ended();
        result
    }
}
