/// Session cookies
///
/// Both cookies are `HttpOnly`, `Secure`, `SameSite=Strict` and scoped to
/// `/`. Removal cookies repeat those attributes; browsers ignore a removal
/// whose attributes differ from the ones the cookie was set with.

use actix_web::cookie::{time::Duration, Cookie, SameSite};

use crate::auth::TokenPair;
use crate::configuration::JwtSettings;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

fn protected_cookie(name: &'static str, value: String, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(name, value)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

/// Cookies carrying a freshly issued pair
pub fn session_cookies(tokens: &TokenPair, jwt: &JwtSettings) -> [Cookie<'static>; 2] {
    [
        protected_cookie(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token.clone(),
            jwt.access_token_expiry,
        ),
        protected_cookie(
            REFRESH_TOKEN_COOKIE,
            tokens.refresh_token.clone(),
            jwt.refresh_token_expiry,
        ),
    ]
}

/// Cookies that make the browser drop both session cookies
pub fn removal_cookies() -> [Cookie<'static>; 2] {
    [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE].map(|name| {
        let mut cookie = protected_cookie(name, String::new(), 0);
        cookie.make_removal();
        cookie
    })
}
