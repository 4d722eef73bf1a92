//! Tracing/logging setup shared by the library crates and the binary.

/// Initialize process-wide logging.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init(config: &LogConfig) {
    tracing::init(config);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat};
