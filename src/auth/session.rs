/// Session lifecycle: login, refresh-token rotation and logout.
///
/// Each account has at most one live refresh token (the one stored on the
/// user record). A refresh token that verifies cryptographically but is not
/// the stored one has been rotated away, logged out, or forged, and is
/// rejected outright.
///
/// Known race: two concurrent `rotate` calls presenting the same live token
/// can both pass the comparison before either writes. Both callers receive a
/// pair, but only the last write survives, so the other caller's new refresh
/// token is dead on arrival. A compare-and-swap on the stored value would
/// close this.

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::issuer::{CredentialIssuer, TokenPair};
use crate::auth::jwt::validate_refresh_token;
use crate::auth::password::verify_password;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, DatabaseError, ValidationError};
use crate::store::{User, UserStore};

pub struct SessionManager {
    store: Arc<dyn UserStore>,
    issuer: CredentialIssuer,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl SessionManager {
    pub fn new(store: Arc<dyn UserStore>, jwt: JwtSettings) -> Self {
        Self {
            issuer: CredentialIssuer::new(store.clone(), jwt),
            store,
        }
    }

    pub fn settings(&self) -> &JwtSettings {
        self.issuer.settings()
    }

    /// Authenticate by username or email and start a new session.
    ///
    /// Unknown user and wrong password produce different errors here, while
    /// `rotate` folds "unknown user" into a generic invalid-token error.
    pub async fn login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<(User, TokenPair), AppError> {
        let username = non_blank(username);
        let email = non_blank(email);
        if username.is_none() && email.is_none() {
            return Err(ValidationError::Required("username or email".to_string()).into());
        }
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ValidationError::Required("password".to_string()))?;

        let user = self
            .store
            .find_by_credentials(username, email)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("User does not exist".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.issuer.issue(user.id).await?;

        let user = self
            .store
            .find_by_id(user.id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("User does not exist".to_string()))?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, tokens))
    }

    /// Exchange a live refresh token for a new pair.
    ///
    /// 1. absent or blank              -> `MissingToken`
    /// 2. bad signature/issuer, expired -> `InvalidRefreshToken`
    /// 3. subject unknown               -> `InvalidRefreshToken`
    /// 4. not the stored token          -> `RefreshTokenReused`
    /// 5. otherwise the stored token is overwritten by a fresh pair
    pub async fn rotate(&self, presented: Option<&str>) -> Result<TokenPair, AppError> {
        let presented = non_blank(presented).ok_or(AuthError::MissingToken)?;

        let claims = validate_refresh_token(presented, self.settings())?;
        let user_id = claims.user_id().ok_or(AuthError::InvalidRefreshToken)?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        match user.refresh_token.as_deref() {
            Some(current) if current == presented => {}
            _ => {
                tracing::warn!(user_id = %user.id, "Refresh token does not match the live session");
                return Err(AuthError::RefreshTokenReused.into());
            }
        }

        let tokens = self.issuer.issue(user.id).await?;
        tracing::info!(user_id = %user.id, "Session rotated");
        Ok(tokens)
    }

    /// End the session of `user_id`. Safe to repeat.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        if !self.store.set_refresh_token(user_id, None).await? {
            tracing::debug!(user_id = %user_id, "Logout for unknown user");
        }
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }
}
