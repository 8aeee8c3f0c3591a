//! Behaviour every backend must share.
//!
//! Each check builds fresh auditors from `make` and panics on a violation, so
//! a backend's test suite is one call per check (or [`run_all`]):
//!
//! ```rust,ignore
//! #[test]
//! fn host_backend_conforms() {
//!     conformance::run_all(&|| Auditor::new(Arc::new(HostDispatcher::default())));
//! }
//! ```

use super::{Raise, RecordingHook, RecordingSubscriber};
use crate::{
    auditor::Auditor,
    span::{ExitInfo, MessageKind, Span, SpanError, SpanMessage},
};
use parking_lot::Mutex;
use std::sync::Arc;
use sysaudit_core::{ADD_HOOK_EVENT, AuditError, Value, subscriber_fn};

/// A factory for fresh, empty auditors on the backend under test.
pub type MakeAuditor<'a> = &'a dyn Fn() -> Auditor;

/// Run every check.
pub fn run_all(make: MakeAuditor<'_>) {
    dispatch_reaches_hooks_in_order(make);
    duplicate_hook_is_ignored(make);
    hook_skips_its_own_admission(make);
    recoverable_veto_is_silent(make);
    fatal_veto_propagates(make);
    hook_error_aborts_dispatch(make);
    hook_added_during_dispatch_misses_event(make);
    subscription_routes_by_name(make);
    subscribers_run_in_order(make);
    span_emits_start_and_end_once(make);
    span_scope_reports_error(make);
    span_end_before_start_fails(make);
}

/// Distinct hooks each see an event once, in registration order.
pub fn dispatch_reaches_hooks_in_order(make: MakeAuditor<'_>) {
    let auditor = make();
    let order = Arc::new(Mutex::new(Vec::new()));
    for id in 0..3 {
        let order = Arc::clone(&order);
        auditor
            .add_hook(sysaudit_core::hook_fn(move |event, _| {
                if event == "evt" {
                    order.lock().push(id);
                }
                Ok(())
            }))
            .unwrap();
    }

    auditor.dispatch("evt", &[Value::Int(1)]).unwrap();
    assert_eq!(*order.lock(), vec![0, 1, 2], "hooks must run in registration order");
}

/// Re-adding a hook leaves the registry unchanged.
pub fn duplicate_hook_is_ignored(make: MakeAuditor<'_>) {
    let auditor = make();
    let a = RecordingHook::new();

    auditor.add_hook(a.hook()).unwrap();
    assert_eq!(auditor.hook_count(), 1);
    auditor.add_hook(a.hook()).unwrap();
    assert_eq!(auditor.hook_count(), 1, "duplicate hook must not be appended");

    auditor.dispatch("evt", &[Value::Int(1)]).unwrap();
    assert_eq!(a.count("evt"), 1);
}

/// A hook is registered once committed: it misses the meta-event that
/// admits it and sees every later one.
pub fn hook_skips_its_own_admission(make: MakeAuditor<'_>) {
    let auditor = make();
    let first = RecordingHook::new();
    let second = RecordingHook::new();

    auditor.add_hook(first.hook()).unwrap();
    assert!(first.seen().is_empty(), "hook saw its own admission round");
    assert!(auditor.contains_hook(&first.hook()));

    auditor.add_hook(second.hook()).unwrap();
    assert_eq!(first.events(), vec![ADD_HOOK_EVENT]);
    assert!(second.seen().is_empty(), "hook saw its own admission round");
}

/// A recoverable error on the meta-event drops the hook without an error.
pub fn recoverable_veto_is_silent(make: MakeAuditor<'_>) {
    let auditor = make();
    let guard = RecordingHook::raising([ADD_HOOK_EVENT], Raise::Recoverable);
    let late = RecordingHook::new();

    auditor.add_hook(guard.hook()).unwrap();
    auditor.add_hook(late.hook()).unwrap();

    assert!(!auditor.contains_hook(&late.hook()), "vetoed hook must be absent");
    auditor.dispatch("test_event", &[]).unwrap();
    assert_eq!(guard.count("test_event"), 1);
    assert!(late.seen().is_empty());
}

/// A fatal error on the meta-event reaches the caller and drops the hook.
pub fn fatal_veto_propagates(make: MakeAuditor<'_>) {
    let auditor = make();
    let guard = RecordingHook::raising([ADD_HOOK_EVENT], Raise::Fatal);
    let late = RecordingHook::new();

    auditor.add_hook(guard.hook()).unwrap();
    let err = auditor.add_hook(late.hook()).unwrap_err();

    assert!(err.is_fatal());
    assert!(!auditor.contains_hook(&late.hook()));
}

/// The first failing hook stops the dispatch and its error is returned.
pub fn hook_error_aborts_dispatch(make: MakeAuditor<'_>) {
    let auditor = make();
    let first = RecordingHook::raising(["evt"], Raise::Recoverable);
    let second = RecordingHook::new();
    auditor.add_hook(first.hook()).unwrap();
    auditor.add_hook(second.hook()).unwrap();

    let err = auditor.dispatch("evt", &[]).unwrap_err();
    assert!(err.is_recoverable(), "recoverable errors propagate from dispatch");
    assert_eq!(second.count("evt"), 0);
}

/// A hook registered while an event is in flight does not receive it.
pub fn hook_added_during_dispatch_misses_event(make: MakeAuditor<'_>) {
    let auditor = make();
    let late = RecordingHook::new();
    let inner = auditor.clone();
    let late_hook = late.hook();
    // Holds a clone of the auditor; the cycle only lives as long as the test.
    auditor
        .add_hook(sysaudit_core::hook_fn(move |event, _| {
            if event == "install" {
                inner.add_hook(Arc::clone(&late_hook))?;
            }
            Ok(())
        }))
        .unwrap();

    auditor.dispatch("install", &[]).unwrap();
    assert!(auditor.contains_hook(&late.hook()));
    assert_eq!(late.count("install"), 0);

    auditor.dispatch("after", &[]).unwrap();
    assert_eq!(late.count("after"), 1);
}

/// Subscribers only see their own event name.
pub fn subscription_routes_by_name(make: MakeAuditor<'_>) {
    let auditor = make();
    let f = RecordingSubscriber::new();
    auditor.subscribe("E", f.subscriber()).unwrap();

    auditor.dispatch("E", &[Value::Int(1), Value::Int(2)]).unwrap();
    auditor.dispatch("F", &[Value::Int(1), Value::Int(2)]).unwrap();

    assert_eq!(f.calls(), vec![vec![Value::Int(1), Value::Int(2)]]);
}

/// Subscribers to one name run in subscription order.
pub fn subscribers_run_in_order(make: MakeAuditor<'_>) {
    let auditor = make();
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["f1", "f2"] {
        let order = Arc::clone(&order);
        auditor
            .subscribe(
                "E",
                subscriber_fn(move |args| {
                    order.lock().push((tag, args.to_vec()));
                    Ok(())
                }),
            )
            .unwrap();
    }

    auditor.dispatch("E", &[Value::Int(9)]).unwrap();
    assert_eq!(
        *order.lock(),
        vec![("f1", vec![Value::Int(9)]), ("f2", vec![Value::Int(9)])]
    );
}

fn span_kinds(auditor: &Auditor, name: &str) -> Arc<Mutex<Vec<SpanMessage>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    auditor
        .subscribe(
            name,
            subscriber_fn(move |args| {
                if let Some(message) = SpanMessage::from_args(args) {
                    sink.lock().push(message.clone());
                }
                Ok(())
            }),
        )
        .unwrap();
    seen
}

/// Repeated `start`/`end` emit one message each.
pub fn span_emits_start_and_end_once(make: MakeAuditor<'_>) {
    let auditor = make();
    let seen = span_kinds(&auditor, "s");
    let mut span = Span::new(&auditor, "s");

    span.start(Value::Null).unwrap();
    span.start(Value::Null).unwrap();
    span.end(Value::Null).unwrap();
    span.end(Value::Null).unwrap();

    let kinds: Vec<MessageKind> = seen.lock().iter().map(|m| m.kind.clone()).collect();
    assert_eq!(kinds, vec![MessageKind::Start, MessageKind::End]);
}

/// A failing scope emits one `end` carrying the error and still fails.
pub fn span_scope_reports_error(make: MakeAuditor<'_>) {
    let auditor = make();
    let seen = span_kinds(&auditor, "s");
    let mut span = Span::new(&auditor, "s");

    let out: Result<(), AuditError> =
        span.scope(Value::Null, |_| Err(AuditError::fatal("scope failed")));

    assert_eq!(out.unwrap_err().to_string(), "fatal audit error: scope failed");
    let seen = seen.lock();
    let ends: Vec<&SpanMessage> = seen.iter().filter(|m| m.kind == MessageKind::End).collect();
    assert_eq!(ends.len(), 1);
    let exit = ExitInfo::from_value(&ends[0].data).expect("exit data");
    assert_eq!(exit.error_value.as_deref(), Some("fatal audit error: scope failed"));
}

/// `end` before `start` is a fatal precondition violation.
pub fn span_end_before_start_fails(make: MakeAuditor<'_>) {
    let auditor = make();
    let mut span = Span::new(&auditor, "s");

    let err = span.end(Value::Null).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.downcast_ref::<SpanError>().is_some());
}
