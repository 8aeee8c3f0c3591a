//! The process-wide default auditor.
//!
//! Built once, either explicitly with [`init_global`] at startup or lazily
//! from [`BACKEND_ENV`](crate::registry::BACKEND_ENV) on first use of
//! [`global`]. It lives for the rest of the process.

use crate::{auditor::Auditor, registry::BackendConfig};
use std::sync::OnceLock;
use sysaudit_core::ConfigError;

static GLOBAL: OnceLock<Auditor> = OnceLock::new();

/// Select the global auditor's backend explicitly.
///
/// Fails if the backend is unavailable or the global auditor already exists.
pub fn init_global(config: &BackendConfig) -> Result<&'static Auditor, ConfigError> {
    let auditor = Auditor::from_config(config)?;
    let kind = auditor.kind();
    GLOBAL
        .set(auditor)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    tracing::info!(backend = %kind, "global auditor initialized");
    Ok(global())
}

/// The global auditor, created from the environment if not yet initialized.
///
/// An invalid or unavailable environment setting is logged and replaced by
/// the default resolution order.
pub fn global() -> &'static Auditor {
    GLOBAL.get_or_init(|| {
        let config = BackendConfig::from_env().unwrap_or_else(|err| {
            tracing::warn!(%err, "ignoring backend configuration");
            BackendConfig::default()
        });
        let auditor = Auditor::from_config(&config).unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to default backend resolution");
            Auditor::from_config(&BackendConfig::default()).unwrap_or_else(|_| Auditor::pure())
        });
        tracing::info!(backend = %auditor.kind(), "global auditor initialized");
        auditor
    })
}
