use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use kards_db::models::{CardProgress, DueCard, StudySession};
use uuid::Uuid;

use super::{
    DeckAnalytics, SessionEnded, SessionStarted, SpeedAck, StudyStore, UserStats, WeeklyActivity,
    model::{CreateSessionRequest, DueQuery, EndSessionRequest, ReviewRequest, SpeedResultRequest},
};
use crate::{
    ApiState,
    auth::AuthUser,
    error::ApiError,
    response::ApiResponse,
    validation::{ValidatedJson, ValidatedQuery},
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Create the study routes
pub fn routes<S: StudyStore>() -> Router<ApiState<S>> {
    Router::new()
        .route(
            "/study/sessions",
            post(create_session::<S>).get(list_sessions::<S>),
        )
        .route(
            "/study/sessions/{session_id}",
            get(get_session::<S>).patch(end_session::<S>),
        )
        .route("/study/review", post(review_card::<S>))
        .route("/study/due", get(due_cards::<S>))
        .route("/study/speed-results", post(submit_speed_results::<S>))
        .route("/study/analytics", get(user_analytics::<S>))
        .route("/study/analytics/weekly", get(weekly_breakdown::<S>))
        .route(
            "/study/analytics/decks/{deck_id}",
            get(deck_analytics::<S>),
        )
}

async fn create_session<S: StudyStore>(
    auth_user: AuthUser,
    State(state): State<ApiState<S>>,
    ValidatedJson(body): ValidatedJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionStarted>>), ApiError> {
    let started = state
        .engine
        .create_session(auth_user.user_id, body.deck_id, body.mode, Utc::now())
        .await?;
    Ok(ApiResponse::created(started))
}

async fn list_sessions<S: StudyStore>(
    auth_user: AuthUser,
    State(state): State<ApiState<S>>,
) -> ApiResult<Vec<StudySession>> {
    let sessions = state.engine.list_sessions(auth_user.user_id).await?;
    Ok(ApiResponse::ok(sessions))
}

async fn get_session<S: StudyStore>(
    auth_user: AuthUser,
    State(state): State<ApiState<S>>,
    session_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StudySession> {
    let Path(session_id) = session_id?;
    let session = state
        .engine
        .get_session(session_id, auth_user.user_id)
        .await?;
    Ok(ApiResponse::ok(session))
}

/// End a session with the client's final totals
async fn end_session<S: StudyStore>(
    auth_user: AuthUser,
    State(state): State<ApiState<S>>,
    session_id: Result<Path<Uuid>, PathRejection>,
    ValidatedJson(body): ValidatedJson<EndSessionRequest>,
) -> ApiResult<SessionEnded> {
    let Path(session_id) = session_id?;
    let ended = state
        .engine
        .end_session(session_id, auth_user.user_id, body.into(), Utc::now())
        .await?;
    Ok(ApiResponse::ok(ended))
}

async fn review_card<S: StudyStore>(
    auth_user: AuthUser,
    State(state): State<ApiState<S>>,
    ValidatedJson(body): ValidatedJson<ReviewRequest>,
) -> ApiResult<CardProgress> {
    let progress = state
        .engine
        .review_card(
            body.session_id,
            auth_user.user_id,
            body.card_id,
            body.correct,
            body.time_spent,
            Utc::now(),
        )
        .await?;
    Ok(ApiResponse::ok(progress))
}

async fn due_cards<S: StudyStore>(
    auth_user: AuthUser,
    State(state): State<ApiState<S>>,
    ValidatedQuery(query): ValidatedQuery<DueQuery>,
) -> ApiResult<Vec<DueCard>> {
    let cards = state
        .engine
        .due_cards(
            auth_user.user_id,
            query.deck_id,
            Utc::now(),
            query.limit.map(|limit| limit as usize),
        )
        .await?;
    Ok(ApiResponse::ok(cards))
}

async fn submit_speed_results<S: StudyStore>(
    auth_user: AuthUser,
    State(state): State<ApiState<S>>,
    ValidatedJson(body): ValidatedJson<SpeedResultRequest>,
) -> ApiResult<SpeedAck> {
    let ack = state
        .engine
        .submit_speed_results(auth_user.user_id, body.into(), Utc::now())
        .await?;
    Ok(ApiResponse::ok(ack))
}

async fn user_analytics<S: StudyStore>(
    auth_user: AuthUser,
    State(state): State<ApiState<S>>,
) -> ApiResult<UserStats> {
    let stats = state
        .engine
        .user_analytics(auth_user.user_id, Utc::now())
        .await?;
    Ok(ApiResponse::ok(stats))
}

async fn weekly_breakdown<S: StudyStore>(
    auth_user: AuthUser,
    State(state): State<ApiState<S>>,
) -> ApiResult<Vec<WeeklyActivity>> {
    let week = state
        .engine
        .weekly_breakdown(auth_user.user_id, Utc::now())
        .await?;
    Ok(ApiResponse::ok(week))
}

/// `data` is null when the user never studied the deck
async fn deck_analytics<S: StudyStore>(
    auth_user: AuthUser,
    State(state): State<ApiState<S>>,
    deck_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Option<DeckAnalytics>> {
    let Path(deck_id) = deck_id?;
    let analytics = state
        .engine
        .deck_analytics(auth_user.user_id, deck_id, Utc::now())
        .await?;
    Ok(ApiResponse::ok(analytics))
}
