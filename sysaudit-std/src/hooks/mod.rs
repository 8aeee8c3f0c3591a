//! Standard hook implementations.

pub mod filter;
pub mod logging;

pub use filter::{EventFilterHook, filtered_hook};
pub use logging::LoggingHook;
