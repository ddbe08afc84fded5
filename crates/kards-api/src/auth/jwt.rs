//! Verification of the session tokens issued by the identity service.
//!
//! Tokens are HS256 JWTs whose subject is the user id. This service only
//! verifies them; issuing and rotating tokens happens elsewhere.

use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Name of the private cookie carrying the token
pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, ApiError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| ApiError::Auth("Invalid user ID in token".to_string()))
    }
}

/// Verify signature and expiry, returning the claims
pub fn verify_jwt_token(token: &str, jwt_secret: &str) -> Result<Claims, ApiError> {
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| {
        tracing::debug!(error = %err, "Rejected auth token");
        ApiError::Auth("Invalid or expired token".to_string())
    })?;

    Ok(token_data.claims)
}
