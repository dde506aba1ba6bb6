//! User-management settings.

use regex::Regex;
use thiserror::Error;

use warden_core::env_or;

/// Default password pattern: at least eight characters.
pub const DEFAULT_PASS_REGEX: &str = "^.{8,}$";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid password pattern: {0}")]
    PasswordPattern(#[from] regex::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsersConfig {
    /// Pattern every new password must match.
    pub pass_regex: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            pass_regex: DEFAULT_PASS_REGEX.to_string(),
        }
    }
}

impl UsersConfig {
    /// Load from `WARDEN_USERS_PASS_REGEX`.
    pub fn from_env() -> Self {
        Self {
            pass_regex: env_or("WARDEN_USERS_PASS_REGEX", DEFAULT_PASS_REGEX),
        }
    }

    pub fn password_policy(&self) -> Result<Regex, ConfigError> {
        Ok(Regex::new(&self.pass_regex)?)
    }
}
