//! Testing utilities for sysaudit.
//!
//! # Features
//!
//! - [`RecordingHook`]: a hook that records every event and can be told to
//!   fail on chosen events
//! - [`RecordingSubscriber`]: a subscriber that records every argument list
//! - [`conformance`]: behaviour checks every [`Dispatcher`] backend must pass
//!
//! [`Dispatcher`]: sysaudit_core::Dispatcher

pub mod conformance;

use parking_lot::Mutex;
use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use sysaudit_core::{AuditError, Hook, HookRef, Subscriber, SubscriberRef, Value};

// ============================================================================
// Recording Hook
// ============================================================================

/// Which error a [`RecordingHook`] raises on its trigger events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Raise {
    /// [`AuditError::Recoverable`].
    Recoverable,
    /// [`AuditError::Fatal`].
    Fatal,
}

struct RecordingState {
    seen: Mutex<Vec<(String, Vec<Value>)>>,
    raise_on: HashSet<String>,
    raise: Raise,
    closed: AtomicBool,
}

/// A hook that records all events it receives.
///
/// Hooks cannot be unregistered, so a test that is done with one calls
/// [`close`](RecordingHook::close); a closed hook ignores everything.
///
/// # Example
///
/// ```rust,ignore
/// let hook = RecordingHook::new();
/// auditor.add_hook(hook.hook())?;
///
/// auditor.dispatch("test_event", &args![1, 2, 3])?;
/// assert_eq!(hook.events(), vec!["test_event"]);
/// ```
#[derive(Clone)]
pub struct RecordingHook {
    state: Arc<RecordingState>,
    hook: HookRef,
}

impl RecordingHook {
    /// A hook that records and never fails.
    pub fn new() -> Self {
        Self::raising(std::iter::empty::<&str>(), Raise::Recoverable)
    }

    /// A hook that records and raises `raise` on any of `events`.
    pub fn raising<I, S>(events: I, raise: Raise) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = Arc::new(RecordingState {
            seen: Mutex::new(Vec::new()),
            raise_on: events.into_iter().map(Into::into).collect(),
            raise,
            closed: AtomicBool::new(false),
        });
        let hook: HookRef = Arc::new(RecordingInner {
            state: Arc::clone(&state),
        });
        Self { state, hook }
    }

    /// The shared hook handle. Always the same `Arc`.
    pub fn hook(&self) -> HookRef {
        Arc::clone(&self.hook)
    }

    /// Recorded `(event, args)` pairs.
    pub fn seen(&self) -> Vec<(String, Vec<Value>)> {
        self.state.seen.lock().clone()
    }

    /// Recorded event names.
    pub fn events(&self) -> Vec<String> {
        self.state.seen.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    /// Number of times `event` was seen.
    pub fn count(&self, event: &str) -> usize {
        self.state.seen.lock().iter().filter(|(e, _)| e == event).count()
    }

    /// Stop recording and raising.
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.state.seen.lock().clear();
    }
}

impl Default for RecordingHook {
    fn default() -> Self {
        Self::new()
    }
}

struct RecordingInner {
    state: Arc<RecordingState>,
}

impl Hook for RecordingInner {
    fn on_event(&self, event: &str, args: &[Value]) -> Result<(), AuditError> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.state.seen.lock().push((event.to_string(), args.to_vec()));
        if self.state.raise_on.contains(event) {
            let cause = format!("saw event {event}");
            return Err(match self.state.raise {
                Raise::Recoverable => AuditError::recoverable(cause),
                Raise::Fatal => AuditError::fatal(cause),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Recording Subscriber
// ============================================================================

/// A subscriber that records every argument list it is called with.
#[derive(Clone)]
pub struct RecordingSubscriber {
    calls: Arc<Mutex<Vec<Vec<Value>>>>,
    count: Arc<AtomicUsize>,
    subscriber: SubscriberRef,
}

impl RecordingSubscriber {
    /// Create a new recording subscriber.
    pub fn new() -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber: SubscriberRef = Arc::new(SubscriberInner {
            calls: Arc::clone(&calls),
            count: Arc::clone(&count),
        });
        Self {
            calls,
            count,
            subscriber,
        }
    }

    /// The shared subscriber handle. Always the same `Arc`.
    pub fn subscriber(&self) -> SubscriberRef {
        Arc::clone(&self.subscriber)
    }

    /// Recorded argument lists.
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.calls.lock().clone()
    }

    /// Number of calls.
    pub fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Default for RecordingSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

struct SubscriberInner {
    calls: Arc<Mutex<Vec<Vec<Value>>>>,
    count: Arc<AtomicUsize>,
}

impl Subscriber for SubscriberInner {
    fn on_args(&self, args: &[Value]) -> Result<(), AuditError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(args.to_vec());
        Ok(())
    }
}
