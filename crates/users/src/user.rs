//! User record as seen by the core.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, UsersResult};

/// Free-form user metadata (a JSON object).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_TLD_LEN: usize = 24;

static LOCAL_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~.-]+$").expect("static regex")
});
static LOCAL_DOTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^\.)|(\.$)|(\.\.)").expect("static regex"));
static HOST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s@]+\.[^\s@]+$").expect("static regex"));

/// A user account.
///
/// `password` holds the hash once persisted. It is never serialized and is
/// cleared on every value handed back to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl User {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Check the fields required to register.
    pub fn validate(&self) -> UsersResult<()> {
        if !is_email(&self.email) {
            return Err(ErrorKind::MalformedEntity.into());
        }
        if self.password.is_empty() {
            return Err(ErrorKind::MalformedEntity.into());
        }
        Ok(())
    }

    /// Strip the password for outward-facing use.
    pub fn redacted(mut self) -> Self {
        self.password.clear();
        self
    }
}

fn is_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > MAX_EMAIL_LEN {
        return false;
    }

    let Some((local, host)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > MAX_LOCAL_LEN || host.len() < 3 {
        return false;
    }
    if LOCAL_DOTS.is_match(local) || !LOCAL_PART.is_match(local) {
        return false;
    }
    if !HOST.is_match(host) {
        return false;
    }

    host.rsplit('.')
        .next()
        .is_some_and(|tld| tld.len() >= 2 && tld.len() <= MAX_TLD_LEN)
}
