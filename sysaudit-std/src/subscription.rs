//! Event-name subscriptions.
//!
//! [`SubscriptionRouter`] demultiplexes dispatched events by name. It is a
//! single hook, installed into its dispatcher the first time anything
//! subscribes, that looks the event name up in a table and calls the
//! subscribers registered for it.
//!
//! ```rust,ignore
//! auditor.subscribe("db.query", subscriber_fn(|args| {
//!     println!("query: {:?}", args);
//!     Ok(())
//! }))?;
//! ```

use parking_lot::{ReentrantMutex, RwLock};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};
use sysaudit_core::{AuditError, Dispatcher, HookRef, SubscriberRef, Value, same_subscriber};

const IDLE: u8 = 0;
const INSTALLING: u8 = 1;
const INSTALLED: u8 = 2;

type SubscriptionTable = HashMap<String, Vec<SubscriberRef>>;

/// Routes events to per-name subscriber lists through one lazily installed hook.
pub struct SubscriptionRouter {
    table: Arc<RwLock<SubscriptionTable>>,
    state: AtomicU8,
    install: ReentrantMutex<()>,
}

impl Default for SubscriptionRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRouter {
    /// Create a router with no subscriptions and no hook installed.
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(HashMap::new())),
            state: AtomicU8::new(IDLE),
            install: ReentrantMutex::new(()),
        }
    }

    /// Subscribe to `event`, installing the routing hook into `dispatcher` on
    /// first use.
    ///
    /// If the installation is vetoed, routing stays inactive and is never
    /// retried; the subscription is still recorded. A fatal installation error
    /// is returned and nothing is recorded. A concurrent `subscribe` blocks
    /// until the installation has finished, so once it returns `Ok` the
    /// routing hook is registered (or was vetoed).
    pub fn subscribe(
        &self,
        dispatcher: &dyn Dispatcher,
        event: &str,
        subscriber: SubscriberRef,
    ) -> Result<(), AuditError> {
        self.ensure_installed(dispatcher)?;

        let mut table = self.table.write();
        let subscribers = table.entry(event.to_string()).or_default();
        if !subscribers.iter().any(|s| same_subscriber(s, &subscriber)) {
            subscribers.push(subscriber);
        }
        Ok(())
    }

    fn ensure_installed(&self, dispatcher: &dyn Dispatcher) -> Result<(), AuditError> {
        if self.state.load(Ordering::Acquire) == INSTALLED {
            return Ok(());
        }
        // Other threads wait here until the installer has finished. The owning
        // thread re-enters when a meta-event observer subscribes.
        let _install = self.install.lock();
        match self.state.load(Ordering::Acquire) {
            IDLE => {}
            // INSTALLED, or a re-entrant call from inside our own `add_hook`.
            _ => return Ok(()),
        }
        self.state.store(INSTALLING, Ordering::Release);

        match dispatcher.add_hook(self.routing_hook()) {
            Ok(()) => {
                self.state.store(INSTALLED, Ordering::Release);
                tracing::debug!("subscription routing hook installed");
                Ok(())
            }
            Err(err) => {
                self.state.store(IDLE, Ordering::Release);
                Err(err)
            }
        }
    }

    fn routing_hook(&self) -> HookRef {
        Arc::new(RoutingHook {
            table: Arc::clone(&self.table),
        })
    }

    /// Whether the routing hook has been handed to the dispatcher.
    ///
    /// `true` even if the dispatcher vetoed it.
    pub fn is_installed(&self) -> bool {
        self.state.load(Ordering::Acquire) == INSTALLED
    }

    /// Number of subscribers for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.table.read().get(event).map_or(0, Vec::len)
    }

    /// Event names with at least one subscriber, sorted.
    pub fn events(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.read().keys().cloned().collect();
        names.sort();
        names
    }
}

struct RoutingHook {
    table: Arc<RwLock<SubscriptionTable>>,
}

impl sysaudit_core::Hook for RoutingHook {
    fn on_event(&self, event: &str, args: &[Value]) -> Result<(), AuditError> {
        // Clone the list so subscribers may subscribe without deadlocking.
        let subscribers = match self.table.read().get(event) {
            Some(subscribers) => subscribers.clone(),
            None => return Ok(()),
        };
        for subscriber in &subscribers {
            subscriber.on_args(args)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PureDispatcher;
    use parking_lot::Mutex;
    use sysaudit_core::{ADD_HOOK_EVENT, hook_fn, subscriber_fn};

    fn collector(log: &Arc<Mutex<Vec<(String, Vec<Value>)>>>, tag: &str) -> SubscriberRef {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        subscriber_fn(move |args| {
            log.lock().push((tag.clone(), args.to_vec()));
            Ok(())
        })
    }

    #[test]
    fn test_installs_once() {
        let dispatcher = PureDispatcher::new();
        let router = SubscriptionRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        router.subscribe(&dispatcher, "a", collector(&log, "a")).unwrap();
        router.subscribe(&dispatcher, "b", collector(&log, "b")).unwrap();

        assert!(router.is_installed());
        assert_eq!(dispatcher.hook_count(), 1);
        assert_eq!(router.events(), vec!["a", "b"]);
    }

    #[test]
    fn test_routes_by_name() {
        let dispatcher = PureDispatcher::new();
        let router = SubscriptionRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        router.subscribe(&dispatcher, "test", collector(&log, "test")).unwrap();
        router.subscribe(&dispatcher, "event", collector(&log, "event")).unwrap();

        dispatcher.dispatch("test", &[Value::Int(1)]).unwrap();
        dispatcher.dispatch("event", &[Value::Int(3)]).unwrap();
        dispatcher.dispatch("other", &[Value::Int(9)]).unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                ("test".to_string(), vec![Value::Int(1)]),
                ("event".to_string(), vec![Value::Int(3)]),
            ]
        );
    }

    #[test]
    fn test_dedup_by_identity() {
        let dispatcher = PureDispatcher::new();
        let router = SubscriptionRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = collector(&log, "x");

        router.subscribe(&dispatcher, "e", Arc::clone(&sub)).unwrap();
        router.subscribe(&dispatcher, "e", Arc::clone(&sub)).unwrap();
        router.subscribe(&dispatcher, "e", collector(&log, "y")).unwrap();

        assert_eq!(router.subscriber_count("e"), 2);
    }

    #[test]
    fn test_vetoed_install_is_not_retried() {
        let dispatcher = PureDispatcher::new();
        dispatcher
            .add_hook(hook_fn(|event, _| {
                if event == ADD_HOOK_EVENT {
                    Err(AuditError::recoverable("no more hooks"))
                } else {
                    Ok(())
                }
            }))
            .unwrap();

        let router = SubscriptionRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        router.subscribe(&dispatcher, "e", collector(&log, "e")).unwrap();
        router.subscribe(&dispatcher, "e", collector(&log, "f")).unwrap();

        assert!(router.is_installed());
        assert_eq!(dispatcher.hook_count(), 1);
        assert_eq!(router.subscriber_count("e"), 2);

        dispatcher.dispatch("e", &[]).unwrap();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_fatal_install_records_nothing() {
        let dispatcher = PureDispatcher::new();
        dispatcher
            .add_hook(hook_fn(|event, _| {
                if event == ADD_HOOK_EVENT {
                    Err(AuditError::fatal("locked down"))
                } else {
                    Ok(())
                }
            }))
            .unwrap();

        let router = SubscriptionRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let err = router
            .subscribe(&dispatcher, "e", collector(&log, "e"))
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(!router.is_installed());
        assert_eq!(router.subscriber_count("e"), 0);
    }

    #[test]
    fn test_subscriber_error_aborts_rest() {
        let dispatcher = PureDispatcher::new();
        let router = SubscriptionRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        router
            .subscribe(
                &dispatcher,
                "e",
                subscriber_fn(|_| Err(AuditError::recoverable("nope"))),
            )
            .unwrap();
        router.subscribe(&dispatcher, "e", collector(&log, "late")).unwrap();

        let err = dispatcher.dispatch("e", &[]).unwrap_err();
        assert!(err.is_recoverable());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_concurrent_subscribe_waits_for_install() {
        use std::sync::{
            Barrier,
            atomic::{AtomicBool, AtomicUsize},
        };
        use std::time::Duration;

        let dispatcher = PureDispatcher::new();
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let stalled = Arc::new(AtomicBool::new(false));
        {
            let (entered, release, stalled) =
                (Arc::clone(&entered), Arc::clone(&release), Arc::clone(&stalled));
            dispatcher
                .add_hook(hook_fn(move |event, _| {
                    if event == ADD_HOOK_EVENT && !stalled.swap(true, Ordering::SeqCst) {
                        entered.wait();
                        release.wait();
                    }
                    Ok(())
                }))
                .unwrap();
        }

        let router = SubscriptionRouter::new();
        let delivered = Arc::new(AtomicUsize::new(0));
        let late = {
            let delivered = Arc::clone(&delivered);
            subscriber_fn(move |_| {
                delivered.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        std::thread::scope(|scope| {
            scope.spawn(|| {
                router
                    .subscribe(&dispatcher, "first", subscriber_fn(|_| Ok(())))
                    .unwrap();
            });
            entered.wait();

            let waiter = scope.spawn(|| {
                router.subscribe(&dispatcher, "E", late).unwrap();
                dispatcher.dispatch("E", &[]).unwrap();
            });
            std::thread::sleep(Duration::from_millis(50));
            release.wait();
            waiter.join().unwrap();
        });

        assert_eq!(delivered.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.hook_count(), 2);
    }

    #[test]
    fn test_reentrant_subscribe_during_install() {
        use std::sync::atomic::AtomicBool;

        let dispatcher = Arc::new(PureDispatcher::new());
        let router = Arc::new(SubscriptionRouter::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let nested = collector(&log, "nested");
        let done = Arc::new(AtomicBool::new(false));
        {
            let (dispatcher_ref, router_ref) = (Arc::clone(&dispatcher), Arc::clone(&router));
            let done = Arc::clone(&done);
            dispatcher
                .add_hook(hook_fn(move |event, _| {
                    if event == ADD_HOOK_EVENT && !done.swap(true, Ordering::SeqCst) {
                        router_ref.subscribe(&*dispatcher_ref, "inner", Arc::clone(&nested))?;
                    }
                    Ok(())
                }))
                .unwrap();
        }

        router.subscribe(&*dispatcher, "outer", collector(&log, "outer")).unwrap();

        assert!(router.is_installed());
        assert_eq!(router.events(), vec!["inner", "outer"]);
        dispatcher.dispatch("inner", &[Value::Int(1)]).unwrap();
        assert_eq!(*log.lock(), vec![("nested".to_string(), vec![Value::Int(1)])]);
    }
}
