/// Principal store
///
/// The service only needs a handful of single-record operations from its
/// backing store. Implementations must make each write atomic per record;
/// no other coordination is assumed.

mod memory;
mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::DatabaseError;

pub type StoreResult<T> = Result<T, DatabaseError>;

/// A registered user as persisted.
///
/// `refresh_token` holds the single live refresh credential for the
/// account. Issuing a new one overwrites it; logout clears it.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The externally visible view of a user. Never carries the password hash
/// or the refresh token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Input for `UserStore::create`
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Find a user whose username or email matches exactly
    async fn find_by_credentials(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>>;

    /// Overwrite or clear the stored refresh token.
    ///
    /// Touches only that field. Returns `false` when no user has `id`.
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool>;

    /// Create a new user; username and email must both be unused
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    /// Replace full name and email, returning the updated user
    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> StoreResult<Option<User>>;

    /// Replace the password hash. Returns `false` when no user has `id`.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;

    /// Point the avatar at a new media URL
    async fn update_avatar(&self, id: Uuid, avatar: &str) -> StoreResult<Option<User>>;

    /// Point the cover image at a new media URL
    async fn update_cover_image(&self, id: Uuid, cover_image: &str) -> StoreResult<Option<User>>;
}
