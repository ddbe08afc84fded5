use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use uuid::Uuid;

use super::jwt::{AUTH_COOKIE, verify_jwt_token};
use crate::{error::ApiError, state::AuthConfig};

/// Authenticated user extractor
///
/// Reads the JWT from the private `auth_token` cookie and rejects the request
/// with `UNAUTHORIZED` when it is missing, tampered with or expired.
///
/// # Example
/// ```
/// use axum::extract::State;
/// use kards_api::{ApiState, auth::AuthUser, error::ApiError};
///
/// async fn protected_route(
///     auth_user: AuthUser,
///     State(state): State<ApiState>,
/// ) -> Result<(), ApiError> {
///     let _ = (auth_user.user_id, state);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    Key: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_config = AuthConfig::from_ref(state);

        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Cookie("Failed to read cookies".to_string()))?;

        let token = jar
            .get(AUTH_COOKIE)
            .ok_or_else(|| ApiError::Auth("Not authenticated".to_string()))?;

        let claims = verify_jwt_token(token.value(), &auth_config.jwt_secret)?;

        Ok(Self {
            user_id: claims.user_id()?,
        })
    }
}
