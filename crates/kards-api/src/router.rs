use axum::{
    Router,
    http::StatusCode,
    response::Response,
    routing::get,
};

use crate::{
    response::error_response,
    state::ApiState,
    study::{self, StudyStore},
};

pub fn router<S: StudyStore>() -> Router<ApiState<S>> {
    Router::new()
        .route("/health", get(health))
        .merge(study::routes())
        .fallback(handler_404)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn handler_404() -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        "The requested resource was not found",
    )
}
