//! Started/finished event pairs around a unit of work.
//!
//! Lighter than a [`Span`](crate::Span): two plain events, `{prefix}.started`
//! and `{prefix}.finished`, with no message payload wrapping.

use crate::auditor::Auditor;
use std::fmt;
use sysaudit_core::{AuditError, Value};

/// Name of the event dispatched before the work runs.
pub fn started_event(prefix: &str) -> String {
    format!("{prefix}.started")
}

/// Name of the event dispatched after the work returns.
pub fn finished_event(prefix: &str) -> String {
    format!("{prefix}.finished")
}

/// Run `f` between a `{prefix}.started` and a `{prefix}.finished` event.
///
/// `started` carries `args`. `finished` carries a single value: `Null` on
/// success, or the error's display text. The finished event is dispatched on
/// both paths; if it fails, its error wins over the result of `f`.
pub fn audited<T, E, F>(auditor: &Auditor, prefix: &str, args: &[Value], f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<AuditError> + fmt::Display,
{
    auditor.dispatch(&started_event(prefix), args)?;
    let outcome = f();
    let error = match &outcome {
        Ok(_) => Value::Null,
        Err(err) => Value::Str(err.to_string()),
    };
    auditor.dispatch(&finished_event(prefix), &[error])?;
    outcome
}
