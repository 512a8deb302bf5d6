//! Lifecycle state of a managed client connection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of one client connection.
///
/// `Created -> Connecting -> Connected` on success, `Connecting -> Failed`
/// on handshake error, `Connected -> Closed` on disconnect. `Failed` and
/// `Closed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Client and transport are built; nothing has touched the network or spawned a process.
    #[default]
    Created,
    /// Handshake in flight.
    Connecting,
    /// Handshake completed.
    Connected,
    /// Closed by disconnect.
    Closed,
    /// Handshake failed.
    Failed,
}

impl ConnectionState {
    /// Get the display text for this state.
    pub fn display(&self) -> &'static str {
        match self {
            ConnectionState::Created => "Created",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Closed => "Closed",
            ConnectionState::Failed => "Failed",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Check if no further transition can leave this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }

    /// Whether the orchestrator may move from `self` to `next`.
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        matches!(
            (self, next),
            (ConnectionState::Created, ConnectionState::Connecting)
                | (ConnectionState::Connecting, ConnectionState::Connected)
                | (ConnectionState::Connecting, ConnectionState::Failed)
                | (ConnectionState::Connected, ConnectionState::Closed)
                | (ConnectionState::Created, ConnectionState::Closed)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_checks() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Created.is_connected());
        assert!(ConnectionState::Failed.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(!ConnectionState::Connecting.is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let all = [
            ConnectionState::Created,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Closed,
            ConnectionState::Failed,
        ];
        for next in all {
            assert!(!ConnectionState::Failed.can_transition_to(next));
            assert!(!ConnectionState::Closed.can_transition_to(next));
        }
        assert!(ConnectionState::Connecting.can_transition_to(ConnectionState::Failed));
        assert!(!ConnectionState::Created.can_transition_to(ConnectionState::Connected));
    }
}
