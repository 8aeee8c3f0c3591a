//! # Spans
//!
//! A [`Span`] represents one unit of work as three kinds of audit messages,
//! all dispatched under the span's name:
//!
//! - `start` - at most once, on the first [`Span::start`]
//! - `annotate` - any number of times
//! - `end` - at most once, on the first [`Span::end`] after starting
//!
//! Each message is a single [`Value::Opaque`] argument wrapping a
//! [`SpanMessage`]. Subscribers recover it with [`SpanMessage::from_args`].
//!
//! # Scoped usage
//!
//! ```rust,ignore
//! let mut span = auditor.span("db.query");
//! let rows = span.scope(Value::Null, |span| {
//!     span.annotate("planning")?;
//!     run_query()
//! })?;
//! ```
//!
//! `end` is emitted exactly once however the scope is left, with the exit
//! condition as its data (see [`ExitInfo`]).
//!
//! # Threading
//!
//! Transitions take `&mut self`. Sharing one span between threads needs a
//! caller-supplied lock; spans hold none of their own.

use crate::auditor::Auditor;
use std::{
    any::Any,
    collections::BTreeMap,
    fmt,
    ops::{Deref, DerefMut},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use sysaudit_core::{AuditError, Value};
use thiserror::Error;

static NEXT_SPAN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique span identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(u64);

impl SpanId {
    fn next() -> Self {
        SpanId(NEXT_SPAN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What `end` does when the span was never started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndPolicy {
    /// Fail with [`SpanError::NotStarted`].
    #[default]
    Strict,
    /// Do nothing.
    Lenient,
}

/// Span precondition violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpanError {
    /// `end` was called before `start`.
    #[error("attempting to end span `{name}` ({id}) before it was started")]
    NotStarted {
        /// Span name.
        name: String,
        /// Span id.
        id: SpanId,
    },
}

/// The kind of a span message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// The span started.
    Start,
    /// The span ended.
    End,
    /// Extra data attached mid-span.
    Annotate,
    /// Caller-defined message type.
    Custom(String),
}

impl MessageKind {
    /// The message type as a string.
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Start => "start",
            MessageKind::End => "end",
            MessageKind::Annotate => "annotate",
            MessageKind::Custom(kind) => kind,
        }
    }
}

impl From<&str> for MessageKind {
    fn from(kind: &str) -> Self {
        match kind {
            "start" => MessageKind::Start,
            "end" => MessageKind::End,
            "annotate" => MessageKind::Annotate,
            other => MessageKind::Custom(other.to_string()),
        }
    }
}

struct SpanInfo {
    id: SpanId,
    name: String,
    data: Value,
}

/// A shared handle identifying a span, carried inside messages.
#[derive(Clone)]
pub struct SpanRef {
    info: Arc<SpanInfo>,
}

impl SpanRef {
    /// The span id.
    pub fn id(&self) -> SpanId {
        self.info.id
    }

    /// The span name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// The data given at construction.
    pub fn data(&self) -> &Value {
        &self.info.data
    }
}

impl PartialEq for SpanRef {
    fn eq(&self, other: &Self) -> bool {
        self.info.id == other.info.id
    }
}

impl Eq for SpanRef {}

impl fmt::Debug for SpanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("name", &self.info.name)
            .field("id", &self.info.id)
            .field("data", &self.info.data)
            .finish()
    }
}

/// The payload of every span event.
#[derive(Debug, Clone)]
pub struct SpanMessage {
    /// Message type.
    pub kind: MessageKind,
    /// The span that sent it.
    pub span: SpanRef,
    /// Message data.
    pub data: Value,
}

impl SpanMessage {
    /// Recover the message from the arguments of a span event.
    pub fn from_args(args: &[Value]) -> Option<&SpanMessage> {
        match args {
            [value] => value.downcast_ref::<SpanMessage>(),
            _ => None,
        }
    }
}

impl fmt::Display for SpanMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SpanMessage(type={:?}, span={}#{}, data={})",
            self.kind.as_str(),
            self.span.name(),
            self.span.id(),
            self.data
        )
    }
}

/// How a scope was left, attached as the data of the `end` message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitInfo {
    /// Type name of the error, if any.
    pub error_type: Option<String>,
    /// Display text of the error, if any.
    pub error_value: Option<String>,
    /// `"recoverable"` or `"fatal"` when the error was an [`AuditError`].
    pub error_kind: Option<String>,
    /// Display text of each cause, outermost first.
    ///
    /// For an [`AuditError`] this starts at its payload.
    pub causes: Vec<String>,
    /// Captured backtrace, if enabled via `RUST_BACKTRACE`.
    pub backtrace: Option<String>,
}

impl ExitInfo {
    /// A normal exit.
    pub fn normal() -> Self {
        Self::default()
    }

    /// An exit caused by `error`.
    ///
    /// An [`AuditError`] also records its kind and the source chain of its
    /// payload; other types record their type name and text only.
    pub fn from_error<E: fmt::Display + 'static>(error: &E) -> Self {
        let mut exit = Self {
            error_type: Some(std::any::type_name::<E>().to_string()),
            error_value: Some(error.to_string()),
            backtrace: capture_backtrace(),
            ..Self::default()
        };
        if let Some(audit) = (error as &dyn Any).downcast_ref::<AuditError>() {
            let kind = if audit.is_recoverable() { "recoverable" } else { "fatal" };
            exit.error_kind = Some(kind.to_string());
            exit.causes = source_chain(audit.payload());
        }
        exit
    }

    /// An exit caused by unwinding.
    pub fn panicked() -> Self {
        Self {
            error_type: Some("panic".to_string()),
            backtrace: capture_backtrace(),
            ..Self::default()
        }
    }

    /// Whether this exit carried an error.
    pub fn is_error(&self) -> bool {
        self.error_type.is_some()
    }

    /// Read exit data back from an `end` message.
    pub fn from_value(value: &Value) -> Option<Self> {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        value.as_map()?;
        let causes = match value.get("causes") {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        Some(Self {
            error_type: text("error_type"),
            error_value: text("error_value"),
            error_kind: text("error_kind"),
            causes,
            backtrace: text("backtrace"),
        })
    }
}

impl From<ExitInfo> for Value {
    fn from(exit: ExitInfo) -> Self {
        let mut map = BTreeMap::new();
        map.insert("error_type".to_string(), Value::from(exit.error_type));
        map.insert("error_value".to_string(), Value::from(exit.error_value));
        map.insert("error_kind".to_string(), Value::from(exit.error_kind));
        map.insert(
            "causes".to_string(),
            Value::List(exit.causes.into_iter().map(Value::from).collect()),
        );
        map.insert("backtrace".to_string(), Value::from(exit.backtrace));
        Value::Map(map)
    }
}

fn source_chain(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut chain = Vec::new();
    let mut next = Some(error);
    while let Some(cause) = next {
        chain.push(cause.to_string());
        next = cause.source();
    }
    chain
}

fn capture_backtrace() -> Option<String> {
    let backtrace = std::backtrace::Backtrace::capture();
    match backtrace.status() {
        std::backtrace::BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

/// A start/end/annotate emitter for one unit of work.
pub struct Span {
    auditor: Auditor,
    handle: SpanRef,
    started: bool,
    ended: bool,
    policy: EndPolicy,
}

impl Span {
    /// Create a span with no data.
    pub fn new(auditor: &Auditor, name: impl Into<String>) -> Self {
        Self::with_data(auditor, name, Value::Null)
    }

    /// Create a span carrying `data`.
    pub fn with_data(auditor: &Auditor, name: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            auditor: auditor.clone(),
            handle: SpanRef {
                info: Arc::new(SpanInfo {
                    id: SpanId::next(),
                    name: name.into(),
                    data: data.into(),
                }),
            },
            started: false,
            ended: false,
            policy: EndPolicy::default(),
        }
    }

    /// Choose what `end` does before `start`.
    pub fn with_end_policy(mut self, policy: EndPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Span name (also the event name of its messages).
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Span identity.
    pub fn id(&self) -> SpanId {
        self.handle.id()
    }

    /// Data given at construction.
    pub fn data(&self) -> &Value {
        self.handle.data()
    }

    /// A handle that compares equal to the `span` of this span's messages.
    pub fn handle(&self) -> SpanRef {
        self.handle.clone()
    }

    /// Whether `start` has emitted.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether `end` has emitted.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// The configured end policy.
    pub fn end_policy(&self) -> EndPolicy {
        self.policy
    }

    /// Dispatch a message of any kind under the span name.
    pub fn message(&self, kind: impl Into<MessageKind>, data: impl Into<Value>) -> Result<(), AuditError> {
        let message = SpanMessage {
            kind: kind.into(),
            span: self.handle.clone(),
            data: data.into(),
        };
        self.auditor
            .dispatch(self.handle.name(), &[Value::opaque(message)])
    }

    /// Emit `start` the first time; later calls do nothing.
    pub fn start(&mut self, data: impl Into<Value>) -> Result<&mut Self, AuditError> {
        if !self.started {
            self.message(MessageKind::Start, data)?;
            self.started = true;
        }
        Ok(self)
    }

    /// Emit `end` the first time after starting; later calls do nothing.
    ///
    /// Before `start`, fails with [`SpanError::NotStarted`] (as a fatal error)
    /// under [`EndPolicy::Strict`] and does nothing under
    /// [`EndPolicy::Lenient`].
    pub fn end(&mut self, data: impl Into<Value>) -> Result<(), AuditError> {
        if !self.started {
            return match self.policy {
                EndPolicy::Strict => Err(AuditError::fatal(SpanError::NotStarted {
                    name: self.name().to_string(),
                    id: self.id(),
                })),
                EndPolicy::Lenient => Ok(()),
            };
        }
        if !self.ended {
            self.message(MessageKind::End, data)?;
            self.ended = true;
        }
        Ok(())
    }

    /// Emit an `annotate` message.
    pub fn annotate(&self, data: impl Into<Value>) -> Result<(), AuditError> {
        self.message(MessageKind::Annotate, data)
    }

    /// Start the span and return a guard that ends it on every exit path.
    pub fn enter(&mut self, data: impl Into<Value>) -> Result<SpanGuard<'_>, AuditError> {
        self.start(data)?;
        Ok(SpanGuard {
            span: self,
            armed: true,
        })
    }

    /// Run `f` inside the span.
    ///
    /// `end` is emitted once with [`ExitInfo`] describing how `f` returned.
    /// The error of `f` is passed through; if emitting `end` itself fails,
    /// that error is returned instead.
    pub fn scope<T, E, F>(&mut self, data: impl Into<Value>, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Span) -> Result<T, E>,
        E: From<AuditError> + fmt::Display + 'static,
    {
        let mut guard = self.enter(data)?;
        let outcome = f(&mut *guard);
        let exit = match &outcome {
            Ok(_) => ExitInfo::normal(),
            Err(err) => ExitInfo::from_error(err),
        };
        guard.finish(exit)?;
        outcome
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("name", &self.name())
            .field("id", &self.id())
            .field("data", self.data())
            .field("started", &self.started)
            .field("ended", &self.ended)
            .finish()
    }
}

/// Ends its span when dropped, unless already ended.
pub struct SpanGuard<'a> {
    span: &'a mut Span,
    armed: bool,
}

impl SpanGuard<'_> {
    /// End the span with explicit exit data.
    ///
    /// The guard is disarmed first, so a failed `end` is not retried on drop.
    pub fn finish(mut self, exit: ExitInfo) -> Result<(), AuditError> {
        self.armed = false;
        self.span.end(exit)
    }
}

impl Deref for SpanGuard<'_> {
    type Target = Span;

    fn deref(&self) -> &Span {
        self.span
    }
}

impl DerefMut for SpanGuard<'_> {
    fn deref_mut(&mut self) -> &mut Span {
        self.span
    }
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        if !self.armed || self.span.ended {
            return;
        }
        let exit = if std::thread::panicking() {
            ExitInfo::panicked()
        } else {
            ExitInfo::normal()
        };
        if let Err(err) = self.span.end(exit) {
            tracing::warn!(span_name = %self.span.name(), %err, "failed to end span on drop");
        }
    }
}
