//! In-memory user store
//!
//! Backs the integration tests and local runs without PostgreSQL. Writes can
//! be switched off to simulate an unreachable store.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::{NewUser, StoreResult, User, UserStore};
use crate::error::DatabaseError;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<Uuid, User>,
    fail_writes: AtomicBool,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored user
    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).map(|entry| entry.value().clone())
    }

    /// Snapshot of a stored user by username
    pub fn get_by_username(&self, username: &str) -> Option<User> {
        self.users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.value().clone())
    }

    /// Make every subsequent write fail with `DatabaseError::Unavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("writes are disabled".to_string()));
        }
        Ok(())
    }

    fn is_taken(&self, except: Option<Uuid>, username: Option<&str>, email: &str) -> bool {
        self.users.iter().any(|entry| {
            Some(entry.id) != except
                && (entry.email == email || username.map_or(false, |u| entry.username == u))
        })
    }

    fn modify(&self, id: Uuid, change: impl FnOnce(&mut User)) -> StoreResult<Option<User>> {
        self.check_writable()?;
        Ok(self.users.get_mut(&id).map(|mut user| {
            change(user.value_mut());
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.get(id))
    }

    async fn find_by_credentials(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| {
                username.map_or(false, |u| entry.username == u)
                    || email.map_or(false, |e| entry.email == e)
            })
            .map(|entry| entry.value().clone()))
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool> {
        self.check_writable()?;
        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.refresh_token = token.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        self.check_writable()?;
        if self.is_taken(None, Some(&user.username), &user.email) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "User with email or username already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            password_hash: user.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> StoreResult<Option<User>> {
        self.check_writable()?;
        if self.is_taken(Some(id), None, email) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "User with email or username already exists".to_string(),
            ));
        }

        self.modify(id, |user| {
            user.full_name = full_name.to_string();
            user.email = email.to_string();
        })
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let updated = self.modify(id, |user| user.password_hash = password_hash.to_string())?;
        Ok(updated.is_some())
    }

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> StoreResult<Option<User>> {
        self.modify(id, |user| user.avatar = avatar.to_string())
    }

    async fn update_cover_image(&self, id: Uuid, cover_image: &str) -> StoreResult<Option<User>> {
        self.modify(id, |user| user.cover_image = Some(cover_image.to_string()))
    }
}
