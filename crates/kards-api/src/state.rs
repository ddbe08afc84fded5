use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sqlx::PgPool;

use crate::{
    ApiConfig,
    config::Environment,
    study::{PgStudyStore, StudyEngine, StudyStore},
};

/// What the auth extractor needs to verify tokens
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Shared handler state, generic over the study store.
#[derive(Clone)]
pub struct ApiState<S = PgStudyStore> {
    pub engine: StudyEngine<S>,
    pub auth: AuthConfig,
    pub cookie_key: Key,
    pub environment: Environment,
}

impl ApiState<PgStudyStore> {
    pub fn new(config: &ApiConfig, pool: PgPool) -> Self {
        Self::with_store(config, PgStudyStore::new(pool))
    }
}

impl<S: StudyStore> ApiState<S> {
    /// Build the state around any store.
    ///
    /// The configuration must have been validated: a cookie secret shorter
    /// than 64 bytes cannot derive a key.
    pub fn with_store(config: &ApiConfig, store: S) -> Self {
        Self {
            engine: StudyEngine::new(store),
            auth: AuthConfig {
                jwt_secret: config.jwt_secret.clone(),
            },
            cookie_key: Key::from(config.cookie_secret.as_bytes()),
            environment: config.env,
        }
    }
}

impl<S> FromRef<ApiState<S>> for Key {
    fn from_ref(state: &ApiState<S>) -> Self {
        state.cookie_key.clone()
    }
}

impl<S> FromRef<ApiState<S>> for AuthConfig {
    fn from_ref(state: &ApiState<S>) -> Self {
        state.auth.clone()
    }
}
