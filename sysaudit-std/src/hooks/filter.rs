//! Event-name filtering hook.

use std::{collections::HashSet, sync::Arc};
use sysaudit_core::{AuditError, Hook, HookRef, Value};

/// A hook that forwards only selected events to an inner callback.
///
/// Unlike a subscription, this is a raw hook: it is registered (and can be
/// vetoed) on its own, and the callback runs at the hook's position in the
/// dispatch order.
///
/// # Example
///
/// ```rust,ignore
/// auditor.add_hook(filtered_hook(["open", "exec"], |args| {
///     tracing::info!(?args, "sensitive call");
///     Ok(())
/// }))?;
/// ```
pub struct EventFilterHook<F> {
    events: HashSet<String>,
    callback: F,
}

impl<F> EventFilterHook<F>
where
    F: Fn(&[Value]) -> Result<(), AuditError> + Send + Sync + 'static,
{
    /// Call `callback` for the named events only.
    pub fn new<I, S>(events: I, callback: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            callback,
        }
    }

    /// Whether `event` passes the filter.
    pub fn matches(&self, event: &str) -> bool {
        self.events.contains(event)
    }
}

impl<F> Hook for EventFilterHook<F>
where
    F: Fn(&[Value]) -> Result<(), AuditError> + Send + Sync + 'static,
{
    fn on_event(&self, event: &str, args: &[Value]) -> Result<(), AuditError> {
        if self.matches(event) {
            (self.callback)(args)
        } else {
            Ok(())
        }
    }
}

/// Shorthand for a shared [`EventFilterHook`].
pub fn filtered_hook<I, S, F>(events: I, callback: F) -> HookRef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: Fn(&[Value]) -> Result<(), AuditError> + Send + Sync + 'static,
{
    Arc::new(EventFilterHook::new(events, callback))
}
