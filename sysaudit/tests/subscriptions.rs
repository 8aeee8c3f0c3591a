//! Event-name subscriptions on top of raw hooks.

use std::sync::{Arc, Mutex};
use sysaudit::{
    ADD_HOOK_EVENT, AuditError, Auditor, Value, args, hook_fn,
    testing::{Raise, RecordingHook, RecordingSubscriber},
};

mod common;
use common::host_auditor;

#[test]
fn test_router_installs_one_hook_lazily() {
    let auditor = Auditor::pure();
    assert_eq!(auditor.hook_count(), 0);
    assert!(!auditor.router().is_installed());

    let a = RecordingSubscriber::new();
    let b = RecordingSubscriber::new();
    auditor.subscribe("fs.open", a.subscriber()).unwrap();
    auditor.subscribe("net.connect", b.subscriber()).unwrap();

    assert!(auditor.router().is_installed());
    assert_eq!(auditor.hook_count(), 1);
    assert_eq!(auditor.router().events(), vec!["fs.open", "net.connect"]);
}

#[test]
fn test_duplicate_subscription_is_ignored() {
    let auditor = Auditor::pure();
    let a = RecordingSubscriber::new();

    auditor.subscribe("E", a.subscriber()).unwrap();
    auditor.subscribe("E", a.subscriber()).unwrap();
    auditor.dispatch("E", &args![1]).unwrap();

    assert_eq!(auditor.router().subscriber_count("E"), 1);
    assert_eq!(a.call_count(), 1);
}

#[test]
fn test_subscriptions_share_auditor_clones() {
    let auditor = Auditor::pure();
    let clone = auditor.clone();
    let a = RecordingSubscriber::new();

    clone.subscribe("E", a.subscriber()).unwrap();
    auditor.dispatch("E", &args!["x"]).unwrap();

    assert_eq!(a.calls(), vec![args!["x"]]);
}

#[test]
fn test_subscriber_error_propagates() {
    let auditor = Auditor::pure();
    auditor
        .subscribe(
            "E",
            sysaudit::subscriber_fn(|_| Err(AuditError::recoverable("not allowed"))),
        )
        .unwrap();

    let err = auditor.dispatch("E", &[]).unwrap_err();
    assert!(err.is_recoverable());
    auditor.dispatch("F", &[]).unwrap();
}

#[test]
fn test_subscribe_from_inside_subscriber() {
    let auditor = Auditor::pure();
    let late = RecordingSubscriber::new();
    let inner = auditor.clone();
    let late_ref = late.subscriber();
    auditor
        .subscribe(
            "E",
            sysaudit::subscriber_fn(move |_| inner.subscribe("E", Arc::clone(&late_ref))),
        )
        .unwrap();

    auditor.dispatch("E", &[]).unwrap();
    assert_eq!(late.call_count(), 0);

    auditor.dispatch("E", &[]).unwrap();
    assert_eq!(late.call_count(), 1);
}

#[test]
fn test_vetoed_router_still_counts_as_installed() {
    let auditor = Auditor::pure();
    let guard = RecordingHook::raising([ADD_HOOK_EVENT], Raise::Recoverable);
    auditor.add_hook(guard.hook()).unwrap();

    let a = RecordingSubscriber::new();
    auditor.subscribe("E", a.subscriber()).unwrap();

    assert!(auditor.router().is_installed());
    assert_eq!(auditor.hook_count(), 1);
    auditor.dispatch("E", &[]).unwrap();
    assert_eq!(a.call_count(), 0);
    assert_eq!(guard.count(ADD_HOOK_EVENT), 1);
}

#[test]
fn test_fatal_router_install_can_be_retried() {
    let auditor = Auditor::pure();
    let guard = RecordingHook::raising([ADD_HOOK_EVENT], Raise::Fatal);
    auditor.add_hook(guard.hook()).unwrap();

    let a = RecordingSubscriber::new();
    assert!(auditor.subscribe("E", a.subscriber()).unwrap_err().is_fatal());
    assert!(!auditor.router().is_installed());

    guard.close();
    auditor.subscribe("E", a.subscriber()).unwrap();
    assert!(auditor.router().is_installed());
    auditor.dispatch("E", &[]).unwrap();
    assert_eq!(a.call_count(), 1);
}

#[test]
fn test_routing_on_host_backend() {
    let auditor = host_auditor();
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second"] {
        let order = Arc::clone(&order);
        auditor
            .subscribe(
                "E",
                sysaudit::subscriber_fn(move |args: &[Value]| {
                    order.lock().unwrap().push((tag, args.len()));
                    Ok(())
                }),
            )
            .unwrap();
    }
    auditor.add_hook(hook_fn(|_, _| Ok(()))).unwrap();

    auditor.dispatch("E", &args![1, 2]).unwrap();
    assert_eq!(*order.lock().unwrap(), vec![("first", 2), ("second", 2)]);
}
