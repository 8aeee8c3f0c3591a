//! Hook storage strategies.
//!
//! A store is the synchronised append-only sequence behind a
//! [`HookRegistry`](super::HookRegistry). Readers always get a snapshot; an
//! append is either fully visible to a snapshot or not at all.

use parking_lot::Mutex;
use std::sync::Arc;
use sysaudit_core::{BackendKind, HookRef, same_hook};

/// A point-in-time view of the registered hooks.
pub type Snapshot = Arc<Vec<HookRef>>;

/// Synchronised, append-only, identity-deduplicated hook storage.
pub trait HookStore: Send + Sync + Default + 'static {
    /// The backend this store implements.
    const KIND: BackendKind;

    /// The hooks as of now, in registration order.
    fn snapshot(&self) -> Snapshot;

    /// Append `hook` unless it is already present. Returns `true` if appended.
    fn push_unique(&self, hook: HookRef) -> bool;
}

/// Mutex-guarded copy-on-write vector. The reference store.
#[derive(Default)]
pub struct LockedStore {
    hooks: Mutex<Snapshot>,
}

impl HookStore for LockedStore {
    const KIND: BackendKind = BackendKind::Pure;

    fn snapshot(&self) -> Snapshot {
        Arc::clone(&*self.hooks.lock())
    }

    fn push_unique(&self, hook: HookRef) -> bool {
        let mut hooks = self.hooks.lock();
        if hooks.iter().any(|h| same_hook(h, &hook)) {
            return false;
        }
        // Snapshots handed out earlier keep the old vector.
        Arc::make_mut(&mut *hooks).push(hook);
        true
    }
}

/// Lock-free reads through [`arc_swap::ArcSwap`].
#[cfg(feature = "accelerated")]
pub struct SwapStore {
    hooks: arc_swap::ArcSwap<Vec<HookRef>>,
}

#[cfg(feature = "accelerated")]
impl Default for SwapStore {
    fn default() -> Self {
        Self {
            hooks: arc_swap::ArcSwap::from_pointee(Vec::new()),
        }
    }
}

#[cfg(feature = "accelerated")]
impl HookStore for SwapStore {
    const KIND: BackendKind = BackendKind::Accelerated;

    fn snapshot(&self) -> Snapshot {
        self.hooks.load_full()
    }

    fn push_unique(&self, hook: HookRef) -> bool {
        let mut appended = false;
        // `rcu` may retry the closure under contention; `appended` reflects the
        // attempt that won.
        self.hooks.rcu(|current| {
            if current.iter().any(|h| same_hook(h, &hook)) {
                appended = false;
                Arc::clone(current)
            } else {
                appended = true;
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend(current.iter().cloned());
                next.push(Arc::clone(&hook));
                Arc::new(next)
            }
        });
        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysaudit_core::hook_fn;

    fn exercise<S: HookStore>() {
        let store = S::default();
        let a = hook_fn(|_, _| Ok(()));
        let b = hook_fn(|_, _| Ok(()));

        assert!(store.push_unique(Arc::clone(&a)));
        let before = store.snapshot();
        assert!(!store.push_unique(Arc::clone(&a)));
        assert!(store.push_unique(Arc::clone(&b)));

        // Old snapshot is unaffected by the later append.
        assert_eq!(before.len(), 1);
        let after = store.snapshot();
        assert_eq!(after.len(), 2);
        assert!(same_hook(&after[0], &a));
        assert!(same_hook(&after[1], &b));
    }

    #[test]
    fn test_locked_store() {
        exercise::<LockedStore>();
    }

    #[cfg(feature = "accelerated")]
    #[test]
    fn test_swap_store() {
        exercise::<SwapStore>();
    }
}
