//! Logging hook for event observation.

use sysaudit_core::{AuditError, Hook, Value};
use tracing::Level;

/// A hook that logs every event through `tracing`.
#[derive(Debug, Clone, Copy)]
pub struct LoggingHook {
    level: Level,
}

impl LoggingHook {
    /// Log at `level`.
    pub const fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl Hook for LoggingHook {
    fn on_event(&self, event: &str, args: &[Value]) -> Result<(), AuditError> {
        // `tracing` macros need the level at compile time.
        if self.level == Level::ERROR {
            tracing::error!(event, ?args, "audit event");
        } else if self.level == Level::WARN {
            tracing::warn!(event, ?args, "audit event");
        } else if self.level == Level::INFO {
            tracing::info!(event, ?args, "audit event");
        } else if self.level == Level::DEBUG {
            tracing::debug!(event, ?args, "audit event");
        } else {
            tracing::trace!(event, ?args, "audit event");
        }
        Ok(())
    }
}
