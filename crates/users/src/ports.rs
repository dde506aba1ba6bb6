//! Contracts of the collaborators the core depends on.

use async_trait::async_trait;

use warden_core::Page;

use crate::error::UsersResult;
use crate::hasher::HashError;
use crate::user::{Metadata, User};

/// Filter and window for listing users.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
    pub offset: u64,
    pub limit: u64,
    /// Restrict to these ids when set.
    pub ids: Option<Vec<String>>,
    /// Substring match on email when set.
    pub email: Option<String>,
    /// Every entry must be present (and equal) in the user's metadata.
    pub metadata: Metadata,
}

/// Durable storage of user records.
///
/// Implementations report missing records as `NotFound` and duplicate
/// emails as `Conflict`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user and return its id.
    async fn save(&self, user: User) -> UsersResult<String>;

    /// Replace the metadata of the user identified by `user.email`.
    async fn update_user(&self, user: User) -> UsersResult<()>;

    async fn retrieve_by_email(&self, email: &str) -> UsersResult<User>;

    async fn retrieve_by_id(&self, id: &str) -> UsersResult<User>;

    /// Page of users matching `query`. The returned metadata echoes the
    /// query's offset and limit.
    async fn retrieve_all(&self, query: &PageQuery) -> UsersResult<Page<User>>;

    /// Store a new password hash for the user with `email`.
    async fn update_password(&self, email: &str, password_hash: &str) -> UsersResult<()>;
}

/// One-way password hashing.
pub trait Hasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// `Ok` when `plain` hashes to `hashed`.
    fn compare(&self, plain: &str, hashed: &str) -> Result<(), HashError>;
}

/// Outbound email delivery.
#[async_trait]
pub trait Emailer: Send + Sync {
    async fn send_password_reset(&self, to: &[String], host: &str, token: &str) -> anyhow::Result<()>;
}
