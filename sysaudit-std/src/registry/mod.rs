//! Reference hook registry.
//!
//! [`HookRegistry`] implements the [`Dispatcher`] contract once, generic over
//! how the hooks are stored:
//!
//! - [`PureDispatcher`] - a mutex-guarded copy-on-write vector
//! - [`AcceleratedDispatcher`] - lock-free snapshots via `arc-swap`
//!   (`accelerated` feature)
//!
//! Both share the audited registration protocol, so their observable
//! behaviour is identical.

pub mod select;
pub mod store;

pub use select::{BackendConfig, BACKEND_ENV, install_native, is_available, select_dispatcher};
pub use store::{HookStore, LockedStore, Snapshot};

#[cfg(feature = "accelerated")]
pub use store::SwapStore;

use std::sync::Arc;
use sysaudit_core::{
    ADD_HOOK_EVENT, AuditError, BackendKind, Dispatcher, HookRef, Value, same_hook,
};

/// An append-only registry of hooks with audited registration.
pub struct HookRegistry<S: HookStore> {
    store: S,
}

/// The reference backend.
pub type PureDispatcher = HookRegistry<LockedStore>;

/// The lock-free read backend.
#[cfg(feature = "accelerated")]
pub type AcceleratedDispatcher = HookRegistry<SwapStore>;

impl<S: HookStore> Default for HookRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: HookStore> HookRegistry<S> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { store: S::default() }
    }

    /// The hooks as of now, in registration order.
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }
}

impl<S: HookStore> Dispatcher for HookRegistry<S> {
    fn kind(&self) -> BackendKind {
        S::KIND
    }

    fn dispatch(&self, event: &str, args: &[Value]) -> Result<(), AuditError> {
        let hooks = self.store.snapshot();
        tracing::trace!(event, hooks = hooks.len(), "dispatching audit event");
        for hook in hooks.iter() {
            hook.on_event(event, args)?;
        }
        Ok(())
    }

    fn add_hook(&self, hook: HookRef) -> Result<(), AuditError> {
        let candidate = [Value::opaque(Arc::clone(&hook))];
        match self.dispatch(ADD_HOOK_EVENT, &candidate) {
            Ok(()) => {}
            Err(AuditError::Recoverable(cause)) => {
                tracing::debug!(%cause, "hook registration vetoed");
                return Ok(());
            }
            Err(fatal @ AuditError::Fatal(_)) => return Err(fatal),
        }

        if !self.store.push_unique(hook) {
            tracing::trace!("hook already registered");
        }
        Ok(())
    }

    fn hook_count(&self) -> usize {
        self.store.snapshot().len()
    }

    fn contains_hook(&self, hook: &HookRef) -> bool {
        self.store.snapshot().iter().any(|h| same_hook(h, hook))
    }
}
