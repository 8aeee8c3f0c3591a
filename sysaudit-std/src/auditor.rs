//! The auditor service object.

use crate::{
    registry::{BackendConfig, PureDispatcher, select_dispatcher},
    span::Span,
    subscription::SubscriptionRouter,
};
use parking_lot::Mutex;
use std::{
    fmt,
    sync::{Arc, Weak},
};
use sysaudit_core::{AuditError, BackendKind, ConfigError, Dispatcher, HookRef, SubscriberRef, Value};

/// One router per live dispatcher.
///
/// The weak handle pins the dispatcher's allocation, so an entry's address
/// cannot be reused until the entry is pruned.
static ROUTERS: Mutex<Vec<(Weak<dyn Dispatcher>, Arc<SubscriptionRouter>)>> =
    Mutex::new(Vec::new());

fn router_for(dispatcher: &Arc<dyn Dispatcher>) -> Arc<SubscriptionRouter> {
    let mut routers = ROUTERS.lock();
    routers.retain(|(owner, _)| owner.strong_count() > 0);
    let key = Arc::as_ptr(dispatcher) as *const ();
    if let Some((_, router)) = routers
        .iter()
        .find(|(owner, _)| owner.as_ptr() as *const () == key)
    {
        return Arc::clone(router);
    }
    let router = Arc::new(SubscriptionRouter::new());
    routers.push((Arc::downgrade(dispatcher), Arc::clone(&router)));
    router
}

/// A dispatcher plus its subscription router.
///
/// Cloning is cheap and every clone shares the same hooks and subscriptions.
/// Auditors built on the same dispatcher share one router, so the routing
/// hook is installed at most once per dispatcher.
///
/// Pass an `Auditor` to whatever needs to emit or observe events; use
/// [`global`](crate::global) only where threading one through is impractical.
#[derive(Clone)]
pub struct Auditor {
    dispatcher: Arc<dyn Dispatcher>,
    router: Arc<SubscriptionRouter>,
}

impl Auditor {
    /// Wrap an existing dispatcher.
    ///
    /// The router lives as long as the dispatcher and is reused by every
    /// auditor built on it.
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        let router = router_for(&dispatcher);
        Self { dispatcher, router }
    }

    /// A fresh auditor on the reference backend.
    pub fn pure() -> Self {
        Self::new(Arc::new(PureDispatcher::new()))
    }

    /// A fresh auditor on the lock-free backend.
    #[cfg(feature = "accelerated")]
    pub fn accelerated() -> Self {
        Self::new(Arc::new(crate::registry::AcceleratedDispatcher::new()))
    }

    /// Select a backend from `config`.
    pub fn from_config(config: &BackendConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(select_dispatcher(config)?))
    }

    /// The selected backend.
    pub fn kind(&self) -> BackendKind {
        self.dispatcher.kind()
    }

    /// The underlying dispatcher.
    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    /// The subscription router.
    pub fn router(&self) -> &SubscriptionRouter {
        &self.router
    }

    /// Broadcast an event to every hook.
    pub fn dispatch(&self, event: &str, args: &[Value]) -> Result<(), AuditError> {
        self.dispatcher.dispatch(event, args)
    }

    /// Register a hook, subject to veto.
    pub fn add_hook(&self, hook: HookRef) -> Result<(), AuditError> {
        self.dispatcher.add_hook(hook)
    }

    /// Subscribe to a single event name.
    pub fn subscribe(&self, event: &str, subscriber: SubscriberRef) -> Result<(), AuditError> {
        self.router.subscribe(self.dispatcher.as_ref(), event, subscriber)
    }

    /// Number of registered hooks (the routing hook counts as one).
    pub fn hook_count(&self) -> usize {
        self.dispatcher.hook_count()
    }

    /// Whether this exact hook is registered.
    pub fn contains_hook(&self, hook: &HookRef) -> bool {
        self.dispatcher.contains_hook(hook)
    }

    /// Create a span that reports through this auditor.
    pub fn span(&self, name: impl Into<String>) -> Span {
        Span::new(self, name)
    }
}

impl fmt::Debug for Auditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auditor")
            .field("backend", &self.kind())
            .field("hooks", &self.hook_count())
            .field("routing", &self.router.is_installed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use sysaudit_core::subscriber_fn;

    fn counter(count: &Arc<AtomicUsize>) -> SubscriberRef {
        let count = Arc::clone(count);
        subscriber_fn(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_auditors_on_one_dispatcher_share_routing() {
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(PureDispatcher::new());
        let a = Auditor::new(Arc::clone(&dispatcher));
        let b = Auditor::new(Arc::clone(&dispatcher));
        let (from_a, from_b) = (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)));

        a.subscribe("job.done", counter(&from_a)).unwrap();
        b.subscribe("job.done", counter(&from_b)).unwrap();

        assert_eq!(dispatcher.hook_count(), 1);
        a.dispatch("job.done", &[]).unwrap();
        assert_eq!(from_a.load(Ordering::SeqCst), 1);
        assert_eq!(from_b.load(Ordering::SeqCst), 1);
        assert_eq!(b.router().subscriber_count("job.done"), 2);
    }

    #[test]
    fn test_separate_dispatchers_get_separate_routers() {
        let a = Auditor::pure();
        let b = Auditor::pure();
        a.subscribe("job.done", counter(&Arc::new(AtomicUsize::new(0)))).unwrap();

        assert_eq!(a.hook_count(), 1);
        assert_eq!(b.hook_count(), 0);
        assert!(!b.router().is_installed());
    }

    #[test]
    fn test_router_outlives_auditor() {
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(PureDispatcher::new());
        let seen = Arc::new(AtomicUsize::new(0));
        Auditor::new(Arc::clone(&dispatcher))
            .subscribe("job.done", counter(&seen))
            .unwrap();

        let later = Auditor::new(Arc::clone(&dispatcher));
        assert!(later.router().is_installed());
        later.subscribe("job.done", counter(&seen)).unwrap();
        assert_eq!(dispatcher.hook_count(), 1);
        later.dispatch("job.done", &[]).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
