//! Procedural macros for sysaudit.
//!
//! This crate provides:
//! - `#[audit_hook]` - Create a `Hook` implementation from a function
//! - `#[audited]` - Wrap a function in `started`/`finished` events

use proc_macro::TokenStream;

mod audited;
mod hook;

/// Turn a function into an audit hook.
///
/// The function must have the shape
/// `fn(event: &str, args: &[Value]) -> Result<(), AuditError>`. It is replaced
/// by a unit struct of the same name implementing `sysaudit::Hook`, with
/// `PRIORITY`, `EVENTS` and `hook_ref()` associated items.
///
/// # Attributes
///
/// - `events = ["a", "b"]`: only these event names reach the body
/// - `priority = N`: installation order for collected hooks (default `0`)
/// - `name = "Name"`: struct name (defaults to the function name)
/// - `collect`: submit the hook for `sysaudit::install_collected_hooks`
///   (requires the `inventory` feature)
///
/// # Example
///
/// ```rust,ignore
/// #[sysaudit::audit_hook(events = ["open"], collect)]
/// fn deny_open(_event: &str, args: &[Value]) -> Result<(), AuditError> {
///     Err(AuditError::recoverable(format!("open denied: {args:?}")))
/// }
/// ```
#[proc_macro_attribute]
pub fn audit_hook(attr: TokenStream, item: TokenStream) -> TokenStream {
    hook::audit_hook_impl(attr, item)
}

/// Dispatch `{prefix}.started` and `{prefix}.finished` around a function.
///
/// The function must return `Result<T, E>` with
/// `E: From<AuditError> + Display`.
///
/// # Attributes
///
/// - `"prefix"` or `prefix = "..."`: event prefix (defaults to the function name)
/// - `auditor = expr`: the `Auditor` to report through (defaults to
///   `sysaudit::global()`)
#[proc_macro_attribute]
pub fn audited(attr: TokenStream, item: TokenStream) -> TokenStream {
    audited::audited_impl(attr, item)
}
