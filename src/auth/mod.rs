/// Authentication module
///
/// Token signing/verification, password hashing, credential issuance and
/// the refresh-token session lifecycle.

mod claims;
mod issuer;
mod jwt;
mod password;
mod session;

pub use claims::{Claims, RefreshClaims};
pub use issuer::{CredentialIssuer, TokenPair};
pub use jwt::{
    generate_access_token, generate_refresh_token, validate_access_token, validate_refresh_token,
};
pub use password::{hash_password, verify_password};
pub use session::SessionManager;
