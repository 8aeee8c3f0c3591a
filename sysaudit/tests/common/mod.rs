#![allow(dead_code)]

use std::sync::{Arc, Mutex, RwLock};
use sysaudit::{
    ADD_HOOK_EVENT, AuditError, Auditor, BackendKind, Dispatcher, HookRef, Value, hook_fn,
    same_hook,
};

// ============================================================================
// Host Dispatcher
// ============================================================================

/// A stand-in for a host runtime's own audit mechanism.
///
/// Implements the dispatcher protocol independently of `HookRegistry`, the
/// way a native integration would.
#[derive(Default)]
pub struct HostDispatcher {
    hooks: RwLock<Vec<HookRef>>,
}

impl HostDispatcher {
    fn hooks(&self) -> Vec<HookRef> {
        self.hooks.read().map(|hooks| hooks.clone()).unwrap_or_default()
    }
}

impl Dispatcher for HostDispatcher {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn dispatch(&self, event: &str, args: &[Value]) -> Result<(), AuditError> {
        for hook in self.hooks() {
            hook.on_event(event, args)?;
        }
        Ok(())
    }

    fn add_hook(&self, hook: HookRef) -> Result<(), AuditError> {
        match self.dispatch(ADD_HOOK_EVENT, &[Value::opaque(Arc::clone(&hook))]) {
            Err(AuditError::Recoverable(_)) => return Ok(()),
            Err(fatal) => return Err(fatal),
            Ok(()) => {}
        }
        let mut hooks = self.hooks.write().map_err(|_| AuditError::fatal("host lock poisoned"))?;
        if !hooks.iter().any(|h| same_hook(h, &hook)) {
            hooks.push(hook);
        }
        Ok(())
    }

    fn hook_count(&self) -> usize {
        self.hooks().len()
    }

    fn contains_hook(&self, hook: &HookRef) -> bool {
        self.hooks().iter().any(|h| same_hook(h, hook))
    }
}

pub fn host_auditor() -> Auditor {
    Auditor::new(Arc::new(HostDispatcher::default()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Every event the auditor sees, as `(name, args)`.
pub fn event_log(auditor: &Auditor) -> Arc<Mutex<Vec<(String, Vec<Value>)>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    auditor
        .add_hook(hook_fn(move |event, args| {
            sink.lock().unwrap().push((event.to_string(), args.to_vec()));
            Ok(())
        }))
        .unwrap();
    log
}

/// Event names only, skipping registration meta-events.
pub fn names(log: &Mutex<Vec<(String, Vec<Value>)>>) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|(event, _)| event != ADD_HOOK_EVENT)
        .map(|(event, _)| event.clone())
        .collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
