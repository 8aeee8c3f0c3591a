//! # sysaudit - Process-Wide Audit Hooks
//!
//! `sysaudit` broadcasts named events to a dynamically registered set of
//! hooks. Adding a hook is itself an audited event, so existing hooks can
//! veto newcomers. On top of that substrate sit a subscription router keyed
//! by event name and [`Span`], a start/end/annotate emitter for units of
//! work.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sysaudit::prelude::*;
//!
//! let auditor = Auditor::pure();
//!
//! auditor.add_hook(hook_fn(|event, args| {
//!     println!("{event}: {args:?}");
//!     Ok(())
//! }))?;
//!
//! auditor.subscribe("db.query", subscriber_fn(|args| {
//!     println!("query: {args:?}");
//!     Ok(())
//! }))?;
//!
//! auditor.dispatch("db.query", &args!["SELECT 1"])?;
//! ```
//!
//! ## Backends
//!
//! Every [`Auditor`] wraps one [`Dispatcher`]:
//!
//! | Backend | Availability |
//! |---|---|
//! | `native` | after a host integration calls [`install_native`] |
//! | `accelerated` | `accelerated` feature (default) |
//! | `pure` | always |
//!
//! [`global`] picks the first available one, or the one named by the
//! `SYSAUDIT_BACKEND` environment variable.
//!
//! ## Features
//!
//! - `accelerated` (default): lock-free registry snapshots via `arc-swap`
//! - `macros`: `#[audit_hook]` and `#[audited]`
//! - `inventory`: link-time hook collection ([`install_collected_hooks`])

#![warn(missing_docs)]

pub use sysaudit_core::{
    // Meta-event
    ADD_HOOK_EVENT,
    // Errors
    AuditError,
    // Backends
    BackendKind,
    BoxError,
    ConfigError,
    Dispatcher,
    // Hooks
    Hook,
    HookRef,
    Opaque,
    // Subscribers
    Subscriber,
    SubscriberRef,
    // Values
    Value,
    args,
    hook_fn,
    same_hook,
    same_subscriber,
    subscriber_fn,
};

pub use sysaudit_std::{
    // Service object
    Auditor,
    BACKEND_ENV,
    BackendConfig,
    // Spans
    EndPolicy,
    // Standard hooks
    EventFilterHook,
    ExitInfo,
    HookRegistry,
    LoggingHook,
    MessageKind,
    PureDispatcher,
    Span,
    SpanError,
    SpanGuard,
    SpanId,
    SpanMessage,
    SpanRef,
    SubscriptionRouter,
    // Helpers
    audited,
    filtered_hook,
    finished_event,
    global,
    init_global,
    install_native,
    is_available,
    select_dispatcher,
    started_event,
};

#[cfg(feature = "accelerated")]
pub use sysaudit_std::AcceleratedDispatcher;

#[cfg(feature = "inventory")]
pub use sysaudit_std::{CollectedHook, collect_hooks, install_collected_hooks};

/// Hook registries and backend selection.
pub mod registry {
    pub use sysaudit_std::registry::*;
}

/// Standard hook implementations.
pub mod hooks {
    pub use sysaudit_std::hooks::*;
}

/// Testing utilities and the backend conformance suite.
pub mod testing {
    pub use sysaudit_std::testing::*;
}

/// Prelude module - common imports for sysaudit.
///
/// # Usage
///
/// ```rust,ignore
/// use sysaudit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AuditError, Auditor, Hook, HookRef, Span, Subscriber, SubscriberRef, Value, args,
        hook_fn, subscriber_fn,
    };
}

#[cfg(feature = "macros")]
pub use sysaudit_macros::{audit_hook, audited};

#[cfg(feature = "inventory")]
pub use inventory;
