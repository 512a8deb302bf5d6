//! Diagnostics sink for the manager.
//!
//! Everything the manager reports goes through `tracing` with the server name
//! attached as a structured field. Records are a side channel only: turning
//! them off via [`crate::ManagerOptions::enable_logging`] changes no return
//! value and no control flow.

use std::fmt::Display;

/// Switchable front for the manager's `tracing` output.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostics {
    enabled: bool,
}

impl Diagnostics {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// A sink that drops every record.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Report a failure attributed to `server`.
    pub fn error(&self, server: &str, message: &str, error: &dyn Display) {
        if self.enabled {
            tracing::error!(server = %server, error = %error, "[{}] {}", server, message);
        }
    }

    pub fn warn(&self, server: &str, message: &str) {
        if self.enabled {
            tracing::warn!(server = %server, "[{}] {}", server, message);
        }
    }

    pub fn info(&self, server: &str, message: &str) {
        if self.enabled {
            tracing::info!(server = %server, "[{}] {}", server, message);
        }
    }

    pub fn debug(&self, server: &str, message: &str) {
        if self.enabled {
            tracing::debug!(server = %server, "[{}] {}", server, message);
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_sink_reports_disabled() {
        assert!(!Diagnostics::disabled().is_enabled());
        assert!(Diagnostics::default().is_enabled());
        // Emitting while disabled is a no-op.
        Diagnostics::disabled().error("srv", "Client error", &"boom");
    }
}
