//! Backend selection.
//!
//! Picks one [`Dispatcher`] among the interchangeable backends. The choice is
//! made once by whoever builds an [`Auditor`](crate::Auditor); nothing here
//! re-selects at runtime.

use super::PureDispatcher;
use std::sync::{Arc, OnceLock};
use sysaudit_core::{BackendKind, ConfigError, Dispatcher};

/// Environment variable naming the backend to use.
pub const BACKEND_ENV: &str = "SYSAUDIT_BACKEND";

static NATIVE: OnceLock<Arc<dyn Dispatcher>> = OnceLock::new();

/// Install the host runtime's dispatcher as the [`BackendKind::Native`] backend.
///
/// Host integrations call this once at startup, before any auditor is built.
pub fn install_native(dispatcher: Arc<dyn Dispatcher>) -> Result<(), ConfigError> {
    NATIVE
        .set(dispatcher)
        .map_err(|_| ConfigError::NativeAlreadyInstalled)?;
    tracing::debug!("native audit backend installed");
    Ok(())
}

/// Whether `kind` can be selected in this process.
pub fn is_available(kind: BackendKind) -> bool {
    match kind {
        BackendKind::Native => NATIVE.get().is_some(),
        BackendKind::Accelerated => cfg!(feature = "accelerated"),
        BackendKind::Pure => true,
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendConfig {
    /// Explicit backend. `None` resolves native, accelerated, pure in that order.
    pub backend: Option<BackendKind>,
}

impl BackendConfig {
    /// Use a specific backend.
    pub fn with_backend(kind: BackendKind) -> Self {
        Self {
            backend: Some(kind),
        }
    }

    /// Read [`BACKEND_ENV`]. Unset or empty means default resolution.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(BACKEND_ENV) {
            Ok(value) if !value.trim().is_empty() => Ok(Self::with_backend(value.parse()?)),
            _ => Ok(Self::default()),
        }
    }

    /// The backend this configuration resolves to right now.
    pub fn resolve(&self) -> Result<BackendKind, ConfigError> {
        match self.backend {
            Some(kind) if is_available(kind) => Ok(kind),
            Some(kind) => Err(ConfigError::Unavailable(kind)),
            None => Ok(BackendKind::RESOLUTION_ORDER
                .into_iter()
                .find(|kind| is_available(*kind))
                .unwrap_or(BackendKind::Pure)),
        }
    }
}

/// Build (or, for native, fetch) the dispatcher `config` resolves to.
///
/// Accelerated and pure dispatchers are fresh, independent registries.
pub fn select_dispatcher(config: &BackendConfig) -> Result<Arc<dyn Dispatcher>, ConfigError> {
    let kind = config.resolve()?;
    let dispatcher: Arc<dyn Dispatcher> = match kind {
        BackendKind::Native => match NATIVE.get() {
            Some(native) => Arc::clone(native),
            None => return Err(ConfigError::Unavailable(kind)),
        },
        #[cfg(feature = "accelerated")]
        BackendKind::Accelerated => Arc::new(super::AcceleratedDispatcher::new()),
        #[cfg(not(feature = "accelerated"))]
        BackendKind::Accelerated => return Err(ConfigError::Unavailable(kind)),
        BackendKind::Pure => Arc::new(PureDispatcher::new()),
    };
    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The native slot is process-wide and never filled in these unit tests.

    #[test]
    fn test_explicit_pure() {
        let config = BackendConfig::with_backend(BackendKind::Pure);
        let dispatcher = select_dispatcher(&config).unwrap();
        assert_eq!(dispatcher.kind(), BackendKind::Pure);
    }

    #[test]
    fn test_native_unavailable() {
        let config = BackendConfig::with_backend(BackendKind::Native);
        assert_eq!(
            config.resolve(),
            Err(ConfigError::Unavailable(BackendKind::Native))
        );
        assert!(select_dispatcher(&config).is_err());
    }

    #[test]
    fn test_default_resolution_skips_native() {
        let expected = if cfg!(feature = "accelerated") {
            BackendKind::Accelerated
        } else {
            BackendKind::Pure
        };
        assert_eq!(BackendConfig::default().resolve(), Ok(expected));
    }

    #[test]
    fn test_fresh_registries() {
        let config = BackendConfig::with_backend(BackendKind::Pure);
        let a = select_dispatcher(&config).unwrap();
        let b = select_dispatcher(&config).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
