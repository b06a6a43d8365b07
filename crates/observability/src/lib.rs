//! Process-wide logging setup for executor hosts.

pub mod tracing;

pub use crate::tracing::{LOG_FORMAT_ENV, LogFormat};

/// Initialize logging from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init_with(LogFormat::from_env(), "info");
}
