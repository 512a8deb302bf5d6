//! Concurrent connect/disconnect across a registry.
//!
//! Both operations launch one future per connection and join all of them
//! before returning. There is no timeout: a hung handshake or close stalls
//! its slot of the join.

use futures_util::future::join_all;
use std::future::Future;

use crate::client::registry::ClientRegistry;
use crate::logging::Diagnostics;
use crate::types::{ConnectError, ConnectFailure, ConnectionState, DisconnectError};

/// Launch one operation per item and wait for every one to settle.
pub async fn fan_out<I, F, Fut>(items: I, operation: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    join_all(items.into_iter().map(operation)).await
}

/// Drives the lifecycle of every connection in a registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionOrchestrator {
    diagnostics: Diagnostics,
}

impl ConnectionOrchestrator {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }

    /// Connect every connection still in `Created`.
    ///
    /// Attempts are independent. On failure the error lists each server
    /// that failed; servers that connected stay `Connected` and are not
    /// rolled back.
    pub async fn connect(&self, registry: &mut ClientRegistry) -> Result<(), ConnectError> {
        let pending = registry
            .iter_mut()
            .filter(|connection| connection.state() == ConnectionState::Created);
        let outcomes = fan_out(pending, |connection| async move {
            let result = connection.connect().await;
            (connection.name().to_string(), result)
        })
        .await;

        let mut failures = Vec::new();
        for (server, result) in outcomes {
            match result {
                Ok(()) => self.diagnostics.info(&server, "Connected"),
                Err(source) => {
                    self.diagnostics.error(&server, "Failed to connect", &source);
                    failures.push(ConnectFailure { server, source });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ConnectError { failures })
        }
    }

    /// Close every connection not already `Closed`. Never fails; each close
    /// error is logged with its server name.
    pub async fn disconnect(&self, registry: &mut ClientRegistry) {
        let open = registry
            .iter_mut()
            .filter(|connection| connection.state() != ConnectionState::Closed);
        let outcomes = fan_out(open, |connection| async move {
            let result = connection.close().await;
            (connection.name().to_string(), result)
        })
        .await;

        for (server, result) in outcomes {
            match result {
                Ok(()) => self.diagnostics.debug(&server, "Disconnected"),
                Err(source) => {
                    let error = DisconnectError {
                        server: server.clone(),
                        source,
                    };
                    self.diagnostics.error(&server, "Error during disconnect", &error);
                }
            }
        }
    }
}
