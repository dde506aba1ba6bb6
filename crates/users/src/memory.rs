//! In-memory user repository for tests/dev.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use warden_core::{Page, PageMetadata};

use crate::error::{ErrorKind, UsersError, UsersResult};
use crate::ports::{PageQuery, UserRepository};
use crate::user::User;

/// User records keyed by id, with email uniqueness enforced on save.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> UsersError {
    UsersError::wrap(ErrorKind::Unavailable, "user store lock poisoned")
}

fn matches(user: &User, query: &PageQuery) -> bool {
    if let Some(ids) = &query.ids {
        if !ids.contains(&user.id) {
            return false;
        }
    }
    if let Some(email) = &query.email {
        if !user.email.contains(email.as_str()) {
            return false;
        }
    }
    query
        .metadata
        .iter()
        .all(|(k, v)| user.metadata.get(k) == Some(v))
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: User) -> UsersResult<String> {
        if user.id.is_empty() {
            return Err(ErrorKind::MalformedEntity.into());
        }

        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.values().any(|u| u.email == user.email) || users.contains_key(&user.id) {
            return Err(ErrorKind::Conflict.into());
        }

        let id = user.id.clone();
        users.insert(id.clone(), user);
        Ok(id)
    }

    async fn update_user(&self, user: User) -> UsersResult<()> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let stored = users
            .values_mut()
            .find(|u| u.email == user.email)
            .ok_or(ErrorKind::NotFound)?;

        stored.metadata = user.metadata;
        Ok(())
    }

    async fn retrieve_by_email(&self, email: &str) -> UsersResult<User> {
        let users = self.users.read().map_err(|_| poisoned())?;
        users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| ErrorKind::NotFound.into())
    }

    async fn retrieve_by_id(&self, id: &str) -> UsersResult<User> {
        let users = self.users.read().map_err(|_| poisoned())?;
        users.get(id).cloned().ok_or_else(|| ErrorKind::NotFound.into())
    }

    async fn retrieve_all(&self, query: &PageQuery) -> UsersResult<Page<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;

        let mut selected: Vec<&User> = users.values().filter(|u| matches(u, query)).collect();
        selected.sort_by(|a, b| a.email.cmp(&b.email));

        let total = selected.len() as u64;
        let items = selected
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .map(User::redacted)
            .collect();

        Ok(Page::new(PageMetadata::new(total, query.offset, query.limit), items))
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> UsersResult<()> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let stored = users
            .values_mut()
            .find(|u| u.email == email)
            .ok_or(ErrorKind::NotFound)?;

        stored.password = password_hash.to_string();
        Ok(())
    }
}
