/// JWT Token Generation and Validation
///
/// Access and refresh tokens are HS256 JWTs signed with separate secrets.
/// Verification checks signature, issuer and expiry.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::claims::{Claims, RefreshClaims};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::store::User;

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

fn verify<T: DeserializeOwned>(
    token: &str,
    secret: &str,
    issuer: &str,
) -> Result<T, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    // expiry is exact; no clock-skew grace
    validation.leeway = 0;

    decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

/// Generate a new access token for a user
pub fn generate_access_token(user: &User, config: &JwtSettings) -> Result<String, AppError> {
    let claims = Claims::new(user, config.access_token_expiry, config.issuer.clone());
    sign(&claims, &config.access_token_secret)
}

/// Validate and extract claims from an access token
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AuthError> {
    verify::<Claims>(token, &config.access_token_secret, &config.issuer).map_err(|e| {
        tracing::warn!("Access token rejected: {}", e);
        AuthError::InvalidAccessToken
    })
}

/// Generate a new refresh token for a user
pub fn generate_refresh_token(user_id: Uuid, config: &JwtSettings) -> Result<String, AppError> {
    let claims = RefreshClaims::new(user_id, config.refresh_token_expiry, config.issuer.clone());
    sign(&claims, &config.refresh_token_secret)
}

/// Validate and extract claims from a refresh token
///
/// Tampered, malformed, foreign-issuer and expired tokens all map to
/// `AuthError::InvalidRefreshToken`.
pub fn validate_refresh_token(
    token: &str,
    config: &JwtSettings,
) -> Result<RefreshClaims, AuthError> {
    verify::<RefreshClaims>(token, &config.refresh_token_secret, &config.issuer).map_err(|e| {
        tracing::warn!("Refresh token rejected: {}", e);
        AuthError::InvalidRefreshToken
    })
}
