//! # Audit Hooks
//!
//! The lowest-level observer in sysaudit: a callback invoked for every
//! dispatched event, in registration order.
//!
//! Hooks receive the event name and its arguments. Returning an error aborts
//! the rest of the dispatch and hands the error to whoever dispatched:
//!
//! - [`AuditError::Recoverable`] vetoes. When the event being dispatched is a
//!   hook registration, the registration is silently dropped.
//! - [`AuditError::Fatal`] always reaches the caller.
//!
//! Hooks are shared as [`HookRef`] and compared by identity, never by value:
//! registering the same `Arc` twice is a no-op, registering two equal-looking
//! closures is not.

use crate::{error::AuditError, value::Value};
use std::sync::Arc;

/// An observer of every dispatched event.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an audit hook",
    label = "missing `Hook` implementation",
    note = "Hooks implement `on_event(&self, event: &str, args: &[Value])`, or are closures of that shape."
)]
pub trait Hook: Send + Sync + 'static {
    /// Called for each dispatched event.
    fn on_event(&self, event: &str, args: &[Value]) -> Result<(), AuditError>;
}

// Blanket implementation for closures
impl<F> Hook for F
where
    F: Fn(&str, &[Value]) -> Result<(), AuditError> + Send + Sync + 'static,
{
    fn on_event(&self, event: &str, args: &[Value]) -> Result<(), AuditError> {
        (self)(event, args)
    }
}

/// A shared, identity-comparable hook.
pub type HookRef = Arc<dyn Hook>;

/// Turn a closure into a [`HookRef`].
///
/// Pins the closure signature so the error type does not need annotating.
pub fn hook_fn<F>(f: F) -> HookRef
where
    F: Fn(&str, &[Value]) -> Result<(), AuditError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Returns `true` if both handles point at the same hook.
pub fn same_hook(a: &HookRef, b: &HookRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_not_equality() {
        let a = hook_fn(|_, _| Ok(()));
        let b = hook_fn(|_, _| Ok(()));
        let a2 = Arc::clone(&a);

        assert!(same_hook(&a, &a2));
        assert!(!same_hook(&a, &b));
    }

    #[test]
    fn test_closure_is_hook() {
        let hook = hook_fn(|event, args| {
            if event == "deny" {
                Err(AuditError::recoverable(format!("denied with {} args", args.len())))
            } else {
                Ok(())
            }
        });

        assert!(hook.on_event("allow", &[]).is_ok());
        let err = hook.on_event("deny", &[Value::Null]).unwrap_err();
        assert!(err.is_recoverable());
    }
}
