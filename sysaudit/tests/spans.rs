//! Span lifecycles observed through subscriptions.

use std::sync::{Arc, Mutex};
use sysaudit::{
    AuditError, Auditor, EndPolicy, ExitInfo, MessageKind, Span, SpanMessage, Value,
    subscriber_fn,
};

mod common;
use common::host_auditor;

fn collect(auditor: &Auditor, name: &str) -> Arc<Mutex<Vec<SpanMessage>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    auditor
        .subscribe(
            name,
            subscriber_fn(move |args| {
                if let Some(message) = SpanMessage::from_args(args) {
                    sink.lock().unwrap().push(message.clone());
                }
                Ok(())
            }),
        )
        .unwrap();
    seen
}

#[test]
fn test_nested_spans_report_separately() {
    let auditor = Auditor::pure();
    let outer_seen = collect(&auditor, "request");
    let inner_seen = collect(&auditor, "request.db");

    let mut outer = auditor.span("request");
    let out: Result<usize, AuditError> = outer.scope("GET /", |outer| {
        outer.annotate("routing")?;
        let mut inner = Span::with_data(&auditor, "request.db", "users");
        inner.scope(Value::Null, |_| Ok(3))
    });

    assert_eq!(out.unwrap(), 3);
    let kinds: Vec<MessageKind> = outer_seen
        .lock()
        .unwrap()
        .iter()
        .map(|m| m.kind.clone())
        .collect();
    assert_eq!(
        kinds,
        vec![MessageKind::Start, MessageKind::Annotate, MessageKind::End]
    );
    let inner_seen = inner_seen.lock().unwrap();
    assert_eq!(inner_seen.len(), 2);
    assert_eq!(inner_seen[0].span.data(), &Value::from("users"));
    assert_ne!(inner_seen[0].span.id(), outer.id());
}

#[test]
fn test_spans_with_same_name_are_distinct() {
    let auditor = Auditor::pure();
    let seen = collect(&auditor, "job");

    let mut a = auditor.span("job");
    let mut b = auditor.span("job");
    a.start(Value::Null).unwrap();
    b.start(Value::Null).unwrap();
    b.end(Value::Null).unwrap();
    a.end(Value::Null).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0].span, a.handle());
    assert_eq!(seen[1].span, b.handle());
    assert_ne!(seen[0].span, seen[1].span);
}

#[test]
fn test_guard_finish_with_explicit_exit() {
    let auditor = host_auditor();
    let seen = collect(&auditor, "upload");
    let mut span = auditor.span("upload");

    let guard = span.enter(Value::Null).unwrap();
    guard
        .finish(ExitInfo::from_error(&"connection reset"))
        .unwrap();

    assert!(span.is_ended());
    let seen = seen.lock().unwrap();
    let exit = ExitInfo::from_value(&seen[1].data).unwrap();
    assert_eq!(exit.error_value.as_deref(), Some("connection reset"));
}

#[test]
fn test_lenient_end_before_start() {
    let auditor = Auditor::pure();
    let seen = collect(&auditor, "idle");

    let mut span = auditor.span("idle").with_end_policy(EndPolicy::Lenient);
    span.end(Value::Null).unwrap();

    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_vetoed_start_leaves_span_unstarted() {
    let auditor = Auditor::pure();
    auditor
        .add_hook(sysaudit::hook_fn(|event, _| {
            if event == "guarded" {
                Err(AuditError::recoverable("denied"))
            } else {
                Ok(())
            }
        }))
        .unwrap();

    let mut span = auditor.span("guarded");
    let mut ran = false;
    let out: Result<(), AuditError> = span.scope(Value::Null, |_| {
        ran = true;
        Ok(())
    });

    assert!(out.unwrap_err().is_recoverable());
    assert!(!ran);
    assert!(!span.is_started());
}

#[test]
fn test_message_display() {
    let auditor = Auditor::pure();
    let seen = collect(&auditor, "shown");
    let mut span = auditor.span("shown");
    span.start(Value::Int(5)).unwrap();

    let text = seen.lock().unwrap()[0].to_string();
    assert!(text.starts_with("SpanMessage(type=\"start\", span=shown#"));
    assert!(text.ends_with("data=5)"));
}
