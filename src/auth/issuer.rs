/// Credential Issuer
///
/// Mints an access/refresh pair for a principal and persists the refresh
/// token as the principal's single live session.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::{generate_access_token, generate_refresh_token};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::store::UserStore;

/// A freshly issued credential pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct CredentialIssuer {
    store: Arc<dyn UserStore>,
    jwt: JwtSettings,
}

impl CredentialIssuer {
    pub fn new(store: Arc<dyn UserStore>, jwt: JwtSettings) -> Self {
        Self { store, jwt }
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.jwt
    }

    /// Issue a new pair for `user_id`.
    ///
    /// The principal is re-read from the store. The refresh token is written
    /// before the access token is minted, so a failed write never yields a
    /// usable pair. Every failure is reported as `AuthError::IssuanceFailed`.
    pub async fn issue(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        self.try_issue(user_id).await.map_err(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Failed to issue credentials");
            AppError::Auth(AuthError::IssuanceFailed)
        })
    }

    async fn try_issue(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Internal("principal not found".to_string()))?;

        let refresh_token = generate_refresh_token(user.id, &self.jwt)?;

        if !self.store.set_refresh_token(user.id, Some(&refresh_token)).await? {
            return Err(AppError::Internal(
                "principal vanished before refresh token was stored".to_string(),
            ));
        }

        let access_token = generate_access_token(&user, &self.jwt)?;

        tracing::debug!(user_id = %user.id, "Credentials issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
