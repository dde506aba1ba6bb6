//! Environment-driven settings.
//!
//! Unset variables fall back to a default and the fallback is logged, so a
//! misconfigured deployment shows up in the logs rather than failing silently.

use core::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Read `key`, or return `default` when it is unset or not unicode.
pub fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, default, "environment variable not set; using default");
            default.to_string()
        }
    }
}

/// Read and parse `key`, or return `default` when it is unset.
///
/// A set-but-unparseable value is an error rather than a silent fallback.
pub fn parse_env_or<T>(key: &str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| EnvError::Invalid {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
