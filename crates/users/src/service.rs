//! User-management use cases.
//!
//! Every operation is a stateless decision over (token, requested action).
//! Tokens are resolved through the identity service, authorization questions
//! go to the policy backend behind it, and the repository is always the last
//! dependency touched.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use warden_auth::{AuthError, AuthService, Identity, Object, PolicyRequest, Relation, RelationTuple, TokenKind};
use warden_core::{IdProvider, Page};

use crate::error::{ErrorKind, UsersError, UsersResult};
use crate::ports::{Emailer, Hasher, PageQuery, UserRepository};
use crate::user::{Metadata, User};

/// Member type requested from the identity service when listing a group.
const USERS_MEMBER_TYPE: &str = "users";

/// The use-case interface exposed to transport adapters.
#[async_trait]
pub trait Service: Send + Sync {
    /// Create a new account and return its id. Allowed for anyone while
    /// bootstrap registration is open, otherwise only for authorities.
    async fn register(&self, token: &str, user: User) -> UsersResult<String>;

    /// Exchange credentials for a fresh access token.
    async fn login(&self, user: User) -> UsersResult<String>;

    async fn view_user(&self, token: &str, id: &str) -> UsersResult<User>;

    /// The caller's own account.
    async fn view_profile(&self, token: &str) -> UsersResult<User>;

    async fn list_users(
        &self,
        token: &str,
        offset: u64,
        limit: u64,
        email: &str,
        metadata: Metadata,
    ) -> UsersResult<Page<User>>;

    /// Replace the caller's own metadata.
    async fn update_user(&self, token: &str, user: User) -> UsersResult<()>;

    /// Issue a recovery token for `email` and mail it; `host` is used to
    /// build the reset link.
    async fn generate_reset_token(&self, email: &str, host: &str) -> UsersResult<()>;

    /// Set a new password for the caller. `token` is an access token or a
    /// recovery token.
    async fn reset_password(&self, token: &str, password: &str) -> UsersResult<()>;

    /// Set a new password after re-authenticating with the old one.
    async fn change_password(&self, token: &str, password: &str, old_password: &str) -> UsersResult<()>;

    async fn send_password_reset(&self, host: &str, email: &str, token: &str) -> UsersResult<()>;

    /// Users belonging to the group `group_id`.
    async fn list_members(
        &self,
        token: &str,
        group_id: &str,
        offset: u64,
        limit: u64,
        metadata: Metadata,
    ) -> UsersResult<Page<User>>;
}

/// Default [`Service`] implementation.
pub struct UsersService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn Hasher>,
    auth: Arc<dyn AuthService>,
    email: Arc<dyn Emailer>,
    id_provider: Arc<dyn IdProvider>,
    pass_regex: Regex,
}

impl UsersService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn Hasher>,
        auth: Arc<dyn AuthService>,
        email: Arc<dyn Emailer>,
        id_provider: Arc<dyn IdProvider>,
        pass_regex: Regex,
    ) -> Self {
        Self {
            users,
            hasher,
            auth,
            email,
            id_provider,
            pass_regex,
        }
    }

    fn check_password_format(&self, password: &str) -> UsersResult<()> {
        if self.pass_regex.is_match(password) {
            Ok(())
        } else {
            Err(ErrorKind::PasswordFormat.into())
        }
    }

    fn hash(&self, password: &str) -> UsersResult<String> {
        self.hasher
            .hash(password)
            .map_err(|e| UsersError::wrap(ErrorKind::MalformedEntity, e))
    }

    /// Registration gate: bootstrap tuple, or a caller holding `member` on
    /// `authorities`.
    async fn check_registration_authz(&self, token: &str) -> UsersResult<()> {
        if self.authorize(&RelationTuple::bootstrap()).await.is_ok() {
            tracing::debug!("bootstrap registration open");
            return Ok(());
        }
        if token.is_empty() {
            return Err(ErrorKind::Unauthorized.into());
        }

        let caller = self.identify(token).await?;
        self.authorize(&RelationTuple::new(caller.id, Object::Authorities, Relation::Member))
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::Unauthorized, e))
    }

    /// Look up `user.email` and check its password. Every failure is
    /// `Unauthorized` so callers cannot tell a missing account from a wrong
    /// password.
    async fn authenticate(&self, user: &User) -> UsersResult<User> {
        let stored = self
            .users
            .retrieve_by_email(&user.email)
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::Unauthorized, e))?;

        self.hasher
            .compare(&user.password, &stored.password)
            .map_err(|e| UsersError::wrap(ErrorKind::Unauthorized, e))?;

        Ok(stored)
    }

    async fn identify(&self, token: &str) -> UsersResult<Identity> {
        self.auth
            .identify(token)
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::Unauthorized, e))
    }

    async fn issue(&self, user: &User, kind: TokenKind) -> Result<String, AuthError> {
        self.auth.issue(&user.id, &user.email, kind).await
    }

    /// Fail-closed: a backend error and a negative answer are both
    /// `Authorization`.
    async fn authorize(&self, req: &PolicyRequest) -> UsersResult<()> {
        match self.auth.authorize(req).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ErrorKind::Authorization.into()),
            Err(e) => Err(UsersError::wrap(ErrorKind::Authorization, e)),
        }
    }

    async fn claim_ownership(&self, req: &PolicyRequest) -> UsersResult<()> {
        match self.auth.add_policy(req).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ErrorKind::Authorization.into()),
            Err(e) => Err(UsersError::wrap(ErrorKind::Authorization, e)),
        }
    }
}

#[async_trait]
impl Service for UsersService {
    async fn register(&self, token: &str, mut user: User) -> UsersResult<String> {
        self.check_registration_authz(token).await?;

        user.validate()?;
        self.check_password_format(&user.password)?;

        user.id = self
            .id_provider
            .id()
            .map_err(|e| UsersError::wrap(ErrorKind::CreateUser, e))?;

        // Ownership is granted before the row is written.
        self.claim_ownership(&RelationTuple::new(user.id.as_str(), Object::Users, Relation::Member))
            .await
            .inspect_err(|e| tracing::warn!(user_id = %user.id, error = %e, "ownership grant failed; registration aborted"))?;

        user.password = self.hash(&user.password)?;
        let id = self.users.save(user).await?;

        tracing::info!(user_id = %id, "user registered");
        Ok(id)
    }

    async fn login(&self, user: User) -> UsersResult<String> {
        let stored = self.authenticate(&user).await?;

        self.issue(&stored, TokenKind::User)
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::GetToken, e))
    }

    async fn view_user(&self, token: &str, id: &str) -> UsersResult<User> {
        self.identify(token).await?;

        let stored = self
            .users
            .retrieve_by_id(id)
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::Unauthorized, e))?;

        Ok(User {
            id: id.to_string(),
            ..stored.redacted()
        })
    }

    async fn view_profile(&self, token: &str) -> UsersResult<User> {
        let caller = self.identify(token).await?;

        let stored = self
            .users
            .retrieve_by_email(&caller.email)
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::Unauthorized, e))?;

        Ok(User {
            email: caller.email,
            ..stored.redacted()
        })
    }

    async fn list_users(
        &self,
        token: &str,
        offset: u64,
        limit: u64,
        email: &str,
        metadata: Metadata,
    ) -> UsersResult<Page<User>> {
        self.identify(token).await?;

        let query = PageQuery {
            offset,
            limit,
            ids: None,
            email: (!email.is_empty()).then(|| email.to_string()),
            metadata,
        };
        let mut page = self.users.retrieve_all(&query).await?;
        page.metadata.offset = offset;
        page.metadata.limit = limit;

        Ok(page.map(User::redacted))
    }

    async fn update_user(&self, token: &str, user: User) -> UsersResult<()> {
        let caller = self.identify(token).await?;

        // Scoped to the caller: any id or email in the payload is ignored.
        let update = User {
            email: caller.email,
            metadata: user.metadata,
            ..Default::default()
        };
        self.users.update_user(update).await
    }

    async fn generate_reset_token(&self, email: &str, host: &str) -> UsersResult<()> {
        if email.is_empty() {
            return Err(ErrorKind::MissingEmail.into());
        }

        let user = self
            .users
            .retrieve_by_email(email)
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::UserNotFound, e))?;
        if user.email.is_empty() {
            return Err(ErrorKind::UserNotFound.into());
        }

        let token = self
            .issue(&user, TokenKind::Recovery)
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::RecoveryToken, e))?;

        self.send_password_reset(host, email, &token).await
    }

    async fn reset_password(&self, token: &str, password: &str) -> UsersResult<()> {
        if token.is_empty() {
            return Err(ErrorKind::MissingResetToken.into());
        }
        let caller = self.identify(token).await?;

        let user = self
            .users
            .retrieve_by_email(&caller.email)
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::UserNotFound, e))?;
        if user.email.is_empty() {
            return Err(ErrorKind::UserNotFound.into());
        }

        self.check_password_format(password)?;
        let hash = self.hash(password)?;
        self.users.update_password(&caller.email, &hash).await
    }

    async fn change_password(&self, token: &str, password: &str, old_password: &str) -> UsersResult<()> {
        let caller = self.identify(token).await?;
        self.check_password_format(password)?;

        let credentials = User::new(caller.email.as_str(), old_password);
        if self.authenticate(&credentials).await.is_err() {
            return Err(ErrorKind::Unauthorized.into());
        }

        let user = self
            .users
            .retrieve_by_email(&caller.email)
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::UserNotFound, e))?;
        if user.email.is_empty() {
            return Err(ErrorKind::UserNotFound.into());
        }

        let hash = self.hash(password)?;
        self.users.update_password(&caller.email, &hash).await
    }

    async fn send_password_reset(&self, host: &str, email: &str, token: &str) -> UsersResult<()> {
        let to = [email.to_string()];
        self.email
            .send_password_reset(&to, host, token)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "password reset delivery failed");
                UsersError::wrap(ErrorKind::EmailDelivery, e)
            })
    }

    async fn list_members(
        &self,
        token: &str,
        group_id: &str,
        offset: u64,
        limit: u64,
        metadata: Metadata,
    ) -> UsersResult<Page<User>> {
        self.identify(token).await?;

        let member_ids = self
            .auth
            .members(token, group_id, offset, limit, USERS_MEMBER_TYPE)
            .await
            .map_err(|e| UsersError::wrap(ErrorKind::Authorization, e))?;

        if member_ids.is_empty() {
            return Ok(Page::empty(offset, limit));
        }

        // The identity service already applied the window to the member list.
        let query = PageQuery {
            offset: 0,
            limit: member_ids.len() as u64,
            ids: Some(member_ids),
            email: None,
            metadata,
        };
        let mut page = self.users.retrieve_all(&query).await?;
        page.metadata.offset = offset;
        page.metadata.limit = limit;

        Ok(page.map(User::redacted))
    }
}
