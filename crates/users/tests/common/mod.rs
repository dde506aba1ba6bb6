#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use warden_auth::{
    AuthService, AuthorizationError, InMemoryPolicyAgent, KeyConfig, LocalAuthService, Object, PolicyAgent,
    PolicyRequest, Relation, RelationTuple, TokenKind,
};
use warden_core::{IdProvider, Page, UuidProvider};
use warden_observability::LogFormat;
use warden_users::{
    Argon2Hasher, DEFAULT_PASS_REGEX, Emailer, InMemoryUserRepository, PageQuery, User, UserRepository,
    UsersResult, UsersService,
};

pub const PASSWORD: &str = "correct-horse";

/// In-memory agent whose checks and grants can be switched to fail.
#[derive(Default)]
pub struct SwitchableAgent {
    pub inner: InMemoryPolicyAgent,
    pub fail_checks: AtomicBool,
    pub fail_grants: AtomicBool,
}

#[async_trait]
impl PolicyAgent for SwitchableAgent {
    async fn check_policy(&self, req: &PolicyRequest) -> Result<(), AuthorizationError> {
        if self.fail_checks.load(Ordering::SeqCst) {
            return Err(AuthorizationError::backend("backend offline"));
        }
        self.inner.check_policy(req).await
    }

    async fn add_policy(&self, req: &PolicyRequest) -> Result<(), AuthorizationError> {
        if self.fail_grants.load(Ordering::SeqCst) {
            return Err(AuthorizationError::backend("backend offline"));
        }
        self.inner.add_policy(req).await
    }
}

/// Repository that counts writes.
#[derive(Default)]
pub struct RecordingRepo {
    pub inner: InMemoryUserRepository,
    pub saves: AtomicUsize,
}

#[async_trait]
impl UserRepository for RecordingRepo {
    async fn save(&self, user: User) -> UsersResult<String> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(user).await
    }

    async fn update_user(&self, user: User) -> UsersResult<()> {
        self.inner.update_user(user).await
    }

    async fn retrieve_by_email(&self, email: &str) -> UsersResult<User> {
        self.inner.retrieve_by_email(email).await
    }

    async fn retrieve_by_id(&self, id: &str) -> UsersResult<User> {
        self.inner.retrieve_by_id(id).await
    }

    async fn retrieve_all(&self, query: &PageQuery) -> UsersResult<Page<User>> {
        self.inner.retrieve_all(query).await
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> UsersResult<()> {
        self.inner.update_password(email, password_hash).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReset {
    pub to: Vec<String>,
    pub host: String,
    pub token: String,
}

#[derive(Default)]
pub struct RecordingEmailer {
    pub sent: Mutex<Vec<SentReset>>,
    pub failing: AtomicBool,
}

impl RecordingEmailer {
    pub fn sent(&self) -> Vec<SentReset> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Emailer for RecordingEmailer {
    async fn send_password_reset(&self, to: &[String], host: &str, token: &str) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("smtp relay refused connection");
        }
        self.sent.lock().unwrap().push(SentReset {
            to: to.to_vec(),
            host: host.to_string(),
            token: token.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingIds {
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl IdProvider for CountingIds {
    fn id(&self) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("entropy source exhausted");
        }
        UuidProvider.id()
    }
}

pub type Auth = LocalAuthService<Arc<SwitchableAgent>>;

pub struct Harness {
    pub svc: UsersService,
    pub repo: Arc<RecordingRepo>,
    pub auth: Arc<Auth>,
    pub agent: Arc<SwitchableAgent>,
    pub emailer: Arc<RecordingEmailer>,
    pub ids: Arc<CountingIds>,
}

impl Harness {
    /// Registration open to anyone.
    pub async fn open() -> Self {
        let h = Self::closed();
        h.agent.inner.add_policy(&RelationTuple::bootstrap()).await.unwrap();
        h
    }

    /// No bootstrap tuple: only authorities may register users.
    pub fn closed() -> Self {
        warden_observability::init_with(LogFormat::Pretty, "debug");

        let agent = Arc::new(SwitchableAgent::default());
        let auth = Arc::new(LocalAuthService::new(agent.clone(), KeyConfig::default()));
        let repo = Arc::new(RecordingRepo::default());
        let emailer = Arc::new(RecordingEmailer::default());
        let ids = Arc::new(CountingIds::default());

        let svc = UsersService::new(
            repo.clone(),
            Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap()),
            auth.clone(),
            emailer.clone(),
            ids.clone(),
            regex::Regex::new(DEFAULT_PASS_REGEX).unwrap(),
        );

        Self {
            svc,
            repo,
            auth,
            agent,
            emailer,
            ids,
        }
    }

    pub fn saves(&self) -> usize {
        self.repo.saves.load(Ordering::SeqCst)
    }

    /// Token of a caller holding `member` on `authorities`.
    pub async fn authority_token(&self) -> String {
        self.agent
            .inner
            .add_policy(&RelationTuple::new("admin", Object::Authorities, Relation::Member))
            .await
            .unwrap();
        self.auth.issue("admin", "admin@example.com", TokenKind::User).await.unwrap()
    }
}
