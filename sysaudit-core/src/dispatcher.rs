//! Dispatcher contract.
//!
//! A [`Dispatcher`] owns a hook registry and implements the two operations
//! every backend must agree on: `dispatch` and the audited `add_hook`.
//! Host integrations implement it to plug their own mechanism in as the
//! [`BackendKind::Native`] backend.

use crate::{
    error::{AuditError, ConfigError},
    hook::HookRef,
    value::Value,
};
use std::{fmt, str::FromStr};

/// Name of the meta-event dispatched before a hook is registered.
///
/// Its single argument is a [`Value::Opaque`] wrapping the candidate
/// [`HookRef`]. Observers veto the registration by returning
/// [`AuditError::Recoverable`].
pub const ADD_HOOK_EVENT: &str = "sysaudit.add_hook";

/// A hook registry with dispatch.
///
/// Every implementation must behave identically:
///
/// - `dispatch` calls a point-in-time snapshot of the hooks in registration
///   order and stops at the first error, returning it.
/// - `add_hook` first dispatches [`ADD_HOOK_EVENT`]. A recoverable error
///   drops the registration and returns `Ok(())`; a fatal error is returned and
///   the hook is not added; otherwise the hook is appended unless the same
///   hook (by identity) is already present.
///
/// # Registration point
///
/// A hook counts as registered at the moment it is committed to the
/// registry, not when `add_hook` returns. It never sees the
/// [`ADD_HOOK_EVENT`] round that admits it, and a concurrent `dispatch` sees
/// it either fully or not at all. A dispatch on another thread that starts
/// after the commit may call it before `add_hook` has returned to its caller.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot dispatch audit events",
    label = "missing `Dispatcher` implementation",
    note = "Implement `Dispatcher` to plug in a backend."
)]
pub trait Dispatcher: Send + Sync + 'static {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Broadcast an event to every registered hook.
    fn dispatch(&self, event: &str, args: &[Value]) -> Result<(), AuditError>;

    /// Register a hook, subject to veto by the hooks already registered.
    fn add_hook(&self, hook: HookRef) -> Result<(), AuditError>;

    /// Number of registered hooks.
    fn hook_count(&self) -> usize;

    /// Whether this exact hook is registered.
    fn contains_hook(&self, hook: &HookRef) -> bool;
}

/// The interchangeable backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// A mechanism supplied by the host runtime integration.
    Native,
    /// The lock-free read path.
    Accelerated,
    /// The reference implementation.
    Pure,
}

impl BackendKind {
    /// Default resolution order when no backend is configured.
    pub const RESOLUTION_ORDER: [BackendKind; 3] =
        [BackendKind::Native, BackendKind::Accelerated, BackendKind::Pure];

    /// The canonical configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::Accelerated => "accelerated",
            BackendKind::Pure => "pure",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "native-runtime" => Ok(BackendKind::Native),
            "accelerated" => Ok(BackendKind::Accelerated),
            "pure" | "pure-fallback" => Ok(BackendKind::Pure),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}
