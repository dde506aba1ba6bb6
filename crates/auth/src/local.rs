//! In-process identity service.
//!
//! Issues opaque keys, resolves them back to identities, tracks group
//! membership and answers authorization questions through a [`PolicyAgent`].

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use warden_core::{EnvError, parse_env_or};

use crate::claims::{KeyClaims, TokenValidationError, validate_claims};
use crate::identity::{AuthError, AuthService, Identity, TokenKind};
use crate::policies::CreatePoliciesRequest;
use crate::policy::PolicyAgent;
use crate::tuple::{Object, PolicyRequest, Relation, RelationTuple};

/// Lifetimes of issued keys, per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyConfig {
    pub login_duration: Duration,
    pub recovery_duration: Duration,
    pub api_duration: Duration,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            login_duration: Duration::hours(10),
            recovery_duration: Duration::minutes(5),
            api_duration: Duration::days(365),
        }
    }
}

impl KeyConfig {
    /// Load from `WARDEN_AUTH_{LOGIN,RECOVERY,API}_DURATION_SECS`.
    pub fn from_env() -> Result<Self, EnvError> {
        let d = Self::default();
        Ok(Self {
            login_duration: env_lifetime("WARDEN_AUTH_LOGIN_DURATION_SECS", d.login_duration)?,
            recovery_duration: env_lifetime("WARDEN_AUTH_RECOVERY_DURATION_SECS", d.recovery_duration)?,
            api_duration: env_lifetime("WARDEN_AUTH_API_DURATION_SECS", d.api_duration)?,
        })
    }

    pub fn duration(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::User => self.login_duration,
            TokenKind::Recovery => self.recovery_duration,
            TokenKind::Api => self.api_duration,
        }
    }
}

fn env_lifetime(key: &str, default: Duration) -> Result<Duration, EnvError> {
    lifetime(key, parse_env_or(key, default.num_seconds())?)
}

/// A strictly positive key lifetime of `secs` seconds.
fn lifetime(key: &str, secs: i64) -> Result<Duration, EnvError> {
    Duration::try_seconds(secs)
        .filter(|d| *d > Duration::zero())
        .ok_or_else(|| EnvError::Invalid {
            key: key.to_string(),
            message: format!("{secs} is not a usable key lifetime in seconds"),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GroupMember {
    id: String,
    member_type: String,
}

/// Identity service running in the same process as its callers.
#[derive(Debug)]
pub struct LocalAuthService<P> {
    agent: P,
    config: KeyConfig,
    keys: RwLock<HashMap<String, KeyClaims>>,
    groups: RwLock<HashMap<String, Vec<GroupMember>>>,
}

impl<P: PolicyAgent> LocalAuthService<P> {
    pub fn new(agent: P, config: KeyConfig) -> Self {
        Self {
            agent,
            config,
            keys: RwLock::new(HashMap::new()),
            groups: RwLock::new(HashMap::new()),
        }
    }

    pub fn agent(&self) -> &P {
        &self.agent
    }

    /// Resolve `token` as of `now`.
    pub fn identify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Unauthorized);
        }

        let claims = {
            let keys = self.keys.read().map_err(|_| AuthError::Unavailable)?;
            keys.get(token).cloned().ok_or(AuthError::Unauthorized)?
        };

        if let Err(e) = validate_claims(&claims, now) {
            // Keys that can never become valid again are dropped on sight.
            if matches!(e, TokenValidationError::Expired | TokenValidationError::InvalidTimeWindow) {
                let mut keys = self.keys.write().map_err(|_| AuthError::Unavailable)?;
                keys.remove(token);
            }
            return Err(e.into());
        }

        Ok(claims.identity())
    }

    /// Forget an issued key. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> Result<bool, AuthError> {
        let mut keys = self.keys.write().map_err(|_| AuthError::Unavailable)?;
        Ok(keys.remove(token).is_some())
    }

    /// Add members of `member_type` to a group. Existing members are kept once.
    pub fn assign<I, S>(&self, group_id: &str, member_type: &str, member_ids: I) -> Result<(), AuthError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups = self.groups.write().map_err(|_| AuthError::Unavailable)?;
        let members = groups.entry(group_id.to_string()).or_default();

        for id in member_ids {
            let member = GroupMember {
                id: id.into(),
                member_type: member_type.to_string(),
            };
            if !members.contains(&member) {
                members.push(member);
            }
        }

        Ok(())
    }

    /// Grant a batch of relations. Only callers holding `member` on
    /// `authorities` may do this.
    pub async fn add_policies(&self, token: &str, req: &CreatePoliciesRequest) -> Result<(), AuthError> {
        req.validate(token)?;
        let caller = self.identify_at(token, Utc::now())?;

        self.agent
            .check_policy(&RelationTuple::new(caller.id, Object::Authorities, Relation::Member))
            .await?;

        for tuple in req.tuples() {
            self.agent.add_policy(&tuple).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl<P: PolicyAgent> AuthService for LocalAuthService<P> {
    async fn issue(&self, id: &str, email: &str, kind: TokenKind) -> Result<String, AuthError> {
        if id.is_empty() || email.is_empty() {
            return Err(AuthError::MalformedEntity("key requires id and email".to_string()));
        }

        let issued_at = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(self.config.duration(kind))
            .ok_or_else(|| AuthError::MalformedEntity(format!("{kind} key lifetime out of range")))?;
        let claims = KeyClaims {
            id: id.to_string(),
            email: email.to_string(),
            kind,
            issued_at,
            expires_at,
        };
        let token = Uuid::new_v4().simple().to_string();

        let mut keys = self.keys.write().map_err(|_| AuthError::Unavailable)?;
        keys.retain(|_, c| c.expires_at > issued_at);
        keys.insert(token.clone(), claims);
        tracing::debug!(%kind, "issued key");

        Ok(token)
    }

    async fn identify(&self, token: &str) -> Result<Identity, AuthError> {
        self.identify_at(token, Utc::now())
    }

    async fn members(
        &self,
        token: &str,
        group_id: &str,
        offset: u64,
        limit: u64,
        member_type: &str,
    ) -> Result<Vec<String>, AuthError> {
        self.identify(token).await?;

        let groups = self.groups.read().map_err(|_| AuthError::Unavailable)?;
        let Some(members) = groups.get(group_id) else {
            return Ok(Vec::new());
        };

        Ok(members
            .iter()
            .filter(|m| m.member_type == member_type)
            .skip(offset as usize)
            .take(limit as usize)
            .map(|m| m.id.clone())
            .collect())
    }

    async fn authorize(&self, req: &PolicyRequest) -> Result<bool, AuthError> {
        match self.agent.check_policy(req).await {
            Ok(()) => Ok(true),
            Err(_) => {
                tracing::debug!(tuple = %req, "policy check denied");
                Ok(false)
            }
        }
    }

    async fn add_policy(&self, req: &PolicyRequest) -> Result<bool, AuthError> {
        self.agent.add_policy(req).await?;
        Ok(true)
    }
}
