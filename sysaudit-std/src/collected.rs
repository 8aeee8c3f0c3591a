//! Hooks collected at link time via `inventory`.
//!
//! Items submitted with `inventory::submit!` (usually by
//! `#[audit_hook(collect)]`) are gathered here and registered on an
//! [`Auditor`] at startup, highest priority first.

use crate::auditor::Auditor;
use sysaudit_core::{AuditError, HookRef};

/// A hook factory submitted to the distributed collection.
///
/// Inventory items must be constant expressions, so the entry stores a
/// function producing the hook rather than the hook itself.
pub struct CollectedHook {
    /// Builds the hook instance.
    pub factory: fn() -> HookRef,
    /// Installation order (higher installs first).
    pub priority: i32,
    /// Name for diagnostics.
    pub name: &'static str,
}

impl CollectedHook {
    /// Create a new collected hook entry.
    pub const fn new(factory: fn() -> HookRef, priority: i32, name: &'static str) -> Self {
        Self {
            factory,
            priority,
            name,
        }
    }
}

inventory::collect!(CollectedHook);

/// All collected entries sorted by priority (descending), then name.
pub fn collect_hooks() -> Vec<&'static CollectedHook> {
    let mut entries: Vec<&'static CollectedHook> = inventory::iter::<CollectedHook>.into_iter().collect();
    entries.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(b.name)));
    entries
}

/// Build and register every collected hook on `auditor`.
///
/// Returns how many hooks ended up registered. A recoverable veto skips that
/// hook; a fatal error stops installation and is returned.
pub fn install_collected_hooks(auditor: &Auditor) -> Result<usize, AuditError> {
    let mut installed = 0;
    for entry in collect_hooks() {
        let hook = (entry.factory)();
        auditor.add_hook(hook.clone())?;
        if auditor.contains_hook(&hook) {
            installed += 1;
        } else {
            tracing::debug!(name = entry.name, "collected hook vetoed");
        }
    }
    tracing::debug!(installed, "collected hooks installed");
    Ok(installed)
}
