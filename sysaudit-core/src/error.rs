//! Error types for sysaudit.
//!
//! Every hook, subscriber and dispatcher speaks one error type, [`AuditError`],
//! which only has two kinds:
//!
//! - [`AuditError::Recoverable`] - an advisory veto. Swallowed when raised while
//!   a hook registration is being audited, propagated everywhere else.
//! - [`AuditError::Fatal`] - anything else. Never suppressed.
//!
//! The cause travels in a boxed payload slot so callers can downcast it.

use crate::dispatcher::BackendKind;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error raised by hooks, subscribers and dispatchers.
#[derive(Error, Debug)]
pub enum AuditError {
    /// A veto. Suppressed by `add_hook`, propagated by `dispatch`.
    #[error("recoverable audit error: {0}")]
    Recoverable(#[source] BoxError),

    /// A terminating condition. Always propagated to the immediate caller.
    #[error("fatal audit error: {0}")]
    Fatal(#[source] BoxError),
}

impl AuditError {
    /// Create a recoverable (veto) error.
    pub fn recoverable(cause: impl Into<BoxError>) -> Self {
        AuditError::Recoverable(cause.into())
    }

    /// Create a fatal error.
    pub fn fatal(cause: impl Into<BoxError>) -> Self {
        AuditError::Fatal(cause.into())
    }

    /// Returns `true` for [`AuditError::Recoverable`].
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AuditError::Recoverable(_))
    }

    /// Returns `true` for [`AuditError::Fatal`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuditError::Fatal(_))
    }

    /// The underlying cause, whichever the kind.
    pub fn payload(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        match self {
            AuditError::Recoverable(cause) | AuditError::Fatal(cause) => cause.as_ref(),
        }
    }

    /// Downcast the payload to a concrete error type.
    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        self.payload().downcast_ref::<T>()
    }
}

/// Errors raised while choosing or configuring a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configured backend name is not recognised.
    #[error("unknown backend `{0}` (expected one of: native, accelerated, pure)")]
    UnknownBackend(String),

    /// The backend was requested explicitly but is not available in this process.
    #[error("backend `{0}` is not available")]
    Unavailable(BackendKind),

    /// A host integration already installed the native backend.
    #[error("a native backend is already installed")]
    NativeAlreadyInstalled,

    /// The process-global auditor has already been selected.
    #[error("the global auditor is already initialized")]
    AlreadyInitialized,
}
