/// User and session routes
///
/// Mounted under `/api/v1/users`. Login and refresh set the session cookies
/// and echo the tokens in the body; logout clears both cookies.

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, verify_password, Claims, SessionManager, TokenPair};
use crate::configuration::PasswordSettings;
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::middleware::RequestId;
use crate::response::{ApiResponse, Empty};
use crate::routes::cookies::{removal_cookies, session_cookies, REFRESH_TOKEN_COOKIE};
use crate::store::{NewUser, PublicUser, UserStore};
use crate::validators::{
    is_valid_email, is_valid_full_name, is_valid_media_url, is_valid_username, required,
};

pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// URL returned by the media service for the uploaded avatar
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct AvatarRequest {
    pub avatar: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImageRequest {
    pub cover_image: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

fn with_session(
    status: StatusCode,
    tokens: &TokenPair,
    sessions: &SessionManager,
) -> HttpResponseBuilder {
    let mut builder = HttpResponse::build(status);
    for cookie in session_cookies(tokens, sessions.settings()) {
        builder.cookie(cookie);
    }
    builder
}

/// Refresh token sources in priority order: cookie, header, JSON body.
fn presented_refresh_token(req: &HttpRequest, body: Option<&RefreshRequest>) -> Option<String> {
    req.cookie(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            req.headers()
                .get(REFRESH_TOKEN_HEADER)
                .and_then(|h| h.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .or_else(|| body.and_then(|b| b.refresh_token.clone()))
}

/// POST /api/v1/users/register
///
/// # Errors
/// - 400: missing field or failed validation
/// - 409: username or email already registered
pub async fn register(
    request_id: RequestId,
    form: web::Json<RegisterRequest>,
    store: web::Data<dyn UserStore>,
    password_settings: web::Data<PasswordSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "user_registration");

    let full_name = is_valid_full_name(required(form.full_name.as_deref(), "fullName")?)?;
    let email = is_valid_email(required(form.email.as_deref(), "email")?)?;
    let username = is_valid_username(required(form.username.as_deref(), "username")?)?;
    let password = form
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::Required("password".to_string()))?;
    let avatar = is_valid_media_url(required(form.avatar.as_deref(), "avatar")?, "avatar")?;
    let cover_image = match form.cover_image.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => Some(is_valid_media_url(url, "coverImage")?),
        _ => None,
    };

    let password_hash = hash_password(password, password_settings.hash_cost)?;

    let user = store
        .create(NewUser {
            username,
            email,
            full_name,
            avatar,
            cover_image,
            password_hash,
        })
        .await
        .map_err(|e| {
            let err = AppError::Database(e);
            context.log_error(&err);
            err
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(ApiResponse::new(
        StatusCode::CREATED,
        PublicUser::from(user),
        "User registered successfully",
    )))
}

/// POST /api/v1/users/login
///
/// # Errors
/// - 400: neither username nor email, or no password
/// - 404: no such user
/// - 401: wrong password
/// - 500: session could not be stored
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let (user, tokens) = sessions
        .login(
            form.username.as_deref(),
            form.email.as_deref(),
            form.password.as_deref(),
        )
        .await?;

    let response = with_session(StatusCode::OK, &tokens, &sessions).json(ApiResponse::new(
        StatusCode::OK,
        LoginData {
            user: PublicUser::from(user),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        },
        "User logged in successfully",
    ));

    Ok(response)
}

/// POST /api/v1/users/refresh-token
///
/// Rotates the session: the presented refresh token is replaced and can
/// never be used again.
///
/// # Errors
/// - 401: no token, invalid/expired token, or token already rotated away
/// - 500: new session could not be stored
pub async fn refresh_access_token(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let presented = presented_refresh_token(&req, body.as_deref());

    let tokens = sessions.rotate(presented.as_deref()).await?;

    let response = with_session(StatusCode::OK, &tokens, &sessions).json(ApiResponse::new(
        StatusCode::OK,
        &tokens,
        "Access token refreshed",
    ));

    Ok(response)
}

/// POST /api/v1/users/logout
///
/// **Requires a valid access token.** Clears the stored refresh token and
/// both cookies.
pub async fn logout(
    claims: web::ReqData<Claims>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id().ok_or(AuthError::InvalidAccessToken)?;

    sessions.logout(user_id).await?;

    let mut builder = HttpResponse::Ok();
    for cookie in removal_cookies() {
        builder.cookie(cookie);
    }
    Ok(builder.json(ApiResponse::new(StatusCode::OK, Empty {}, "User logged out")))
}

/// GET /api/v1/users/current-user
///
/// **Requires a valid access token.**
pub async fn current_user(
    claims: web::ReqData<Claims>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id().ok_or(AuthError::InvalidAccessToken)?;

    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::InvalidAccessToken)?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        StatusCode::OK,
        PublicUser::from(user),
        "Current user fetched successfully",
    )))
}

/// POST /api/v1/users/change-password
///
/// **Requires a valid access token.** The live session is left alone.
///
/// # Errors
/// - 400: missing field, weak new password, or wrong old password
pub async fn change_password(
    request_id: RequestId,
    claims: web::ReqData<Claims>,
    form: web::Json<ChangePasswordRequest>,
    store: web::Data<dyn UserStore>,
    password_settings: web::Data<PasswordSettings>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id().ok_or(AuthError::InvalidAccessToken)?;
    let context = ErrorContext::new(&request_id, "change_password").with_user_id(user_id);

    let old_password = form
        .old_password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::Required("oldPassword".to_string()))?;
    let new_password = form
        .new_password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::Required("newPassword".to_string()))?;

    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::InvalidAccessToken)?;

    if !verify_password(old_password, &user.password_hash)? {
        let err = AppError::Validation(ValidationError::IncorrectOldPassword);
        context.log_error(&err);
        return Err(err);
    }

    let password_hash = hash_password(new_password, password_settings.hash_cost)?;
    if !store.update_password(user_id, &password_hash).await? {
        return Err(AuthError::InvalidAccessToken.into());
    }

    tracing::info!(request_id = %context.request_id, user_id = %user_id, "Password changed");

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        StatusCode::OK,
        Empty {},
        "Password changed successfully",
    )))
}

/// PATCH /api/v1/users/update-account
///
/// **Requires a valid access token.** Updates full name and email; the live
/// session is left alone.
///
/// # Errors
/// - 400: missing or invalid field
/// - 409: email already in use
pub async fn update_account(
    claims: web::ReqData<Claims>,
    form: web::Json<UpdateAccountRequest>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id().ok_or(AuthError::InvalidAccessToken)?;

    let full_name = is_valid_full_name(required(form.full_name.as_deref(), "fullName")?)?;
    let email = is_valid_email(required(form.email.as_deref(), "email")?)?;

    let user = store
        .update_account(user_id, &full_name, &email)
        .await?
        .ok_or(AuthError::InvalidAccessToken)?;

    tracing::info!(user_id = %user_id, "Account details updated");

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        StatusCode::OK,
        PublicUser::from(user),
        "Account details updated successfully",
    )))
}

/// PATCH /api/v1/users/avatar
///
/// **Requires a valid access token.** `avatar` is the URL of an image
/// already stored by the media service.
pub async fn update_avatar(
    claims: web::ReqData<Claims>,
    form: web::Json<AvatarRequest>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id().ok_or(AuthError::InvalidAccessToken)?;
    let avatar = is_valid_media_url(required(form.avatar.as_deref(), "avatar")?, "avatar")?;

    let user = store
        .update_avatar(user_id, &avatar)
        .await?
        .ok_or(AuthError::InvalidAccessToken)?;

    tracing::info!(user_id = %user_id, "Avatar updated");

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        StatusCode::OK,
        PublicUser::from(user),
        "Avatar image updated successfully",
    )))
}

/// PATCH /api/v1/users/cover-image
///
/// **Requires a valid access token.**
pub async fn update_cover_image(
    claims: web::ReqData<Claims>,
    form: web::Json<CoverImageRequest>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id().ok_or(AuthError::InvalidAccessToken)?;
    let cover_image = is_valid_media_url(
        required(form.cover_image.as_deref(), "coverImage")?,
        "coverImage",
    )?;

    let user = store
        .update_cover_image(user_id, &cover_image)
        .await?
        .ok_or(AuthError::InvalidAccessToken)?;

    tracing::info!(user_id = %user_id, "Cover image updated");

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        StatusCode::OK,
        PublicUser::from(user),
        "Cover image updated successfully",
    )))
}
