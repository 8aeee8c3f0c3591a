//! # sysaudit-std
//!
//! Standard implementations for the sysaudit instrumentation substrate.
//!
//! This crate provides:
//! - **Hook registries**: [`PureDispatcher`], [`AcceleratedDispatcher`] and
//!   backend selection ([`BackendConfig`], [`select_dispatcher`])
//! - **Service object**: [`Auditor`], plus the process-wide [`global`] one
//! - **Subscriptions**: [`SubscriptionRouter`]
//! - **Spans**: [`Span`], [`SpanGuard`], [`SpanMessage`]
//! - **Standard hooks**: Logging, event filter
//! - **Helpers**: [`audited`]
//! - **Testing**: recording hooks and the backend conformance suite

#![warn(missing_docs)]

// Re-export core traits
pub use sysaudit_core;

// Modules
pub mod audited;
pub mod auditor;
#[cfg(feature = "inventory")]
pub mod collected;
pub mod global;
pub mod hooks;
pub mod registry;
pub mod span;
pub mod subscription;
pub mod testing;

pub use audited::{audited, finished_event, started_event};
pub use auditor::Auditor;
#[cfg(feature = "inventory")]
pub use collected::{CollectedHook, collect_hooks, install_collected_hooks};
pub use global::{global, init_global};
pub use hooks::{EventFilterHook, LoggingHook, filtered_hook};
#[cfg(feature = "accelerated")]
pub use registry::AcceleratedDispatcher;
pub use registry::{
    BACKEND_ENV, BackendConfig, HookRegistry, PureDispatcher, install_native, is_available,
    select_dispatcher,
};
pub use span::{EndPolicy, ExitInfo, MessageKind, Span, SpanError, SpanGuard, SpanId, SpanMessage, SpanRef};
pub use subscription::SubscriptionRouter;

#[cfg(feature = "inventory")]
pub use inventory;
