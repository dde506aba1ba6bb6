//! Process-wide tracing/logging setup.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::{LogFormat, init, init_with};
