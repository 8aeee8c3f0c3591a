//! Subscribers: callbacks scoped to a single event name.
//!
//! Unlike a [`Hook`](crate::Hook), a subscriber never sees the event name; the
//! subscription router only calls it for the name it subscribed to.

use crate::{error::AuditError, value::Value};
use std::sync::Arc;

/// A callback for one event name.
pub trait Subscriber: Send + Sync + 'static {
    /// Called with the arguments of a matching event.
    fn on_args(&self, args: &[Value]) -> Result<(), AuditError>;
}

impl<F> Subscriber for F
where
    F: Fn(&[Value]) -> Result<(), AuditError> + Send + Sync + 'static,
{
    fn on_args(&self, args: &[Value]) -> Result<(), AuditError> {
        (self)(args)
    }
}

/// A shared, identity-comparable subscriber.
pub type SubscriberRef = Arc<dyn Subscriber>;

/// Turn a closure into a [`SubscriberRef`].
pub fn subscriber_fn<F>(f: F) -> SubscriberRef
where
    F: Fn(&[Value]) -> Result<(), AuditError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Returns `true` if both handles point at the same subscriber.
pub fn same_subscriber(a: &SubscriberRef, b: &SubscriberRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
