use std::fmt;

use thiserror::Error;

/// Failure of the backing store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Kind of resource named in not-found and forbidden errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Session,
    Deck,
    Card,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Session => "session",
            Self::Deck => "deck",
            Self::Card => "card",
        })
    }
}

/// Typed failures of study engine operations.
///
/// Operations return one of these instead of partially applying their
/// effects: every multi-step update runs in a single store transaction that is
/// rolled back when the error is raised.
#[derive(Error, Debug)]
pub enum StudyError {
    #[error("{0} not found")]
    NotFound(Resource),
    #[error("access to this {0} is not allowed")]
    Forbidden(Resource),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for StudyError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(err))
    }
}
