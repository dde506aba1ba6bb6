//! Identity client contract.
//!
//! The boundary to the identity/authorization service: tokens in, identities
//! and decisions out. The user-management core only ever talks to it through
//! [`AuthService`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::claims::TokenValidationError;
use crate::policy::AuthorizationError;
use crate::tuple::PolicyRequest;

/// Caller identity resolved from a bearer token. Lives for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Kind of key the identity service issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Access token handed out on login.
    User,
    /// Short-lived password recovery token.
    Recovery,
    /// Long-lived API key.
    Api,
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenKind::User => f.write_str("user"),
            TokenKind::Recovery => f.write_str("recovery"),
            TokenKind::Api => f.write_str("api"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or invalid credentials provided")]
    Unauthorized,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenValidationError),

    #[error("malformed entity specification: {0}")]
    MalformedEntity(String),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error("identity store unavailable")]
    Unavailable,
}

/// Remote identity/authorization service as seen by the user-management core.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Issue a fresh token of `kind` bound to the given identity.
    async fn issue(&self, id: &str, email: &str, kind: TokenKind) -> Result<String, AuthError>;

    /// Resolve a token to the identity it was issued for.
    async fn identify(&self, token: &str) -> Result<Identity, AuthError>;

    /// Ids of the members of `group_id` with the given member type.
    async fn members(
        &self,
        token: &str,
        group_id: &str,
        offset: u64,
        limit: u64,
        member_type: &str,
    ) -> Result<Vec<String>, AuthError>;

    /// Whether the tuple holds. `Ok(false)` and `Err` both mean "no".
    async fn authorize(&self, req: &PolicyRequest) -> Result<bool, AuthError>;

    /// Grant the tuple.
    async fn add_policy(&self, req: &PolicyRequest) -> Result<bool, AuthError>;
}
