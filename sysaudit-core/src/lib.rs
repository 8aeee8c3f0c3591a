//! # sysaudit-core
//!
//! Contract types for the sysaudit hook-dispatch engine.
//!
//! This crate has minimal dependencies and is what host integrations and
//! alternative backends build against:
//!
//! - [`Value`] - the argument domain of events
//! - [`Hook`] - an observer of every event, shared as [`HookRef`]
//! - [`Subscriber`] - an observer of one event name, shared as [`SubscriberRef`]
//! - [`Dispatcher`] - the dispatch / audited-registration contract every
//!   backend implements
//! - [`AuditError`] - the two-kind (recoverable / fatal) error
//!
//! The reference implementations live in `sysaudit-std`.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod dispatcher;
mod error;
mod hook;
mod subscriber;
mod value;

// Re-exports
pub use dispatcher::{ADD_HOOK_EVENT, BackendKind, Dispatcher};
pub use error::{AuditError, BoxError, ConfigError};
pub use hook::{Hook, HookRef, hook_fn, same_hook};
pub use subscriber::{Subscriber, SubscriberRef, same_subscriber, subscriber_fn};
pub use value::{Opaque, Value};
