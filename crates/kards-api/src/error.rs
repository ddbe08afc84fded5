use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use validator::ValidationErrors;

use crate::{response::error_response, study::StudyError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Study(#[from] StudyError),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Cookie error: {0}")]
    Cookie(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Json(#[from] JsonRejection),
    #[error(transparent)]
    Query(#[from] QueryRejection),
    #[error(transparent)]
    Path(#[from] PathRejection),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Study(StudyError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Study(StudyError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::Study(StudyError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Study(StudyError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Study(StudyError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) | Self::Cookie(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::Json(_) | Self::Query(_) | Self::Path(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::FORBIDDEN => "FORBIDDEN",
            StatusCode::CONFLICT => "CONFLICT",
            StatusCode::BAD_REQUEST => "VALIDATION_ERROR",
            StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
            _ => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Study(StudyError::Store(_)) => "Internal server error".to_string(),
            Self::Study(err) => err.to_string(),
            Self::Auth(msg) | Self::Validation(msg) => msg.clone(),
            Self::Cookie(_) => "Failed to read cookies".to_string(),
            Self::Json(rejection) => rejection.body_text(),
            Self::Query(rejection) => rejection.body_text(),
            Self::Path(rejection) => rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }
        error_response(status, self.code(), self.message())
    }
}
