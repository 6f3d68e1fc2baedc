//! JWT Access Token Validation
//!
//! Tokens are issued by the platform's account service, signed with a
//! shared HS256 secret and carrying the user id in an `id` claim.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::error::{AuthError, AuthResult};

/// Claims carried by a platform access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub id: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Validate and decode an access token.
///
/// Returns an error if the signature does not match, the token has expired,
/// or the `id` claim is empty.
pub fn validate_access_token(token: &str, secret: &str) -> AuthResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    if token_data.claims.id.trim().is_empty() {
        return Err(AuthError::InvalidToken);
    }

    Ok(token_data.claims)
}

/// Validate an access token and return the user id it was issued for.
pub fn decode_user_id(token: &str, secret: &str) -> AuthResult<String> {
    validate_access_token(token, secret).map(|claims| claims.id)
}
