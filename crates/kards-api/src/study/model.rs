//! Request bodies and query strings of the study routes.

use kards_db::models::StudyMode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{
    sessions::FinalCounters,
    speed::{CardOutcome, SpeedSubmission},
};

/// Largest page accepted by the due cards route
pub const MAX_DUE_LIMIT: u32 = 500;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub deck_id: Uuid,
    pub mode: StudyMode,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_session_totals"))]
pub struct EndSessionRequest {
    #[validate(range(min = 0))]
    pub cards_studied: i32,
    #[validate(range(min = 0))]
    pub correct_answers: i32,
    #[validate(range(min = 0))]
    pub total_time: i32,
    #[validate(range(min = 0))]
    pub streak: Option<i32>,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn validate_session_totals(body: &EndSessionRequest) -> Result<(), ValidationError> {
    if body.correct_answers > body.cards_studied {
        return Err(invalid(
            "correct_exceeds_studied",
            "correctAnswers cannot exceed cardsStudied",
        ));
    }
    Ok(())
}

impl From<EndSessionRequest> for FinalCounters {
    fn from(body: EndSessionRequest) -> Self {
        Self {
            cards_studied: body.cards_studied,
            correct_answers: body.correct_answers,
            total_time: body.total_time,
            streak: body.streak,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub session_id: Uuid,
    pub card_id: Uuid,
    pub correct: bool,
    /// Seconds, zero when omitted
    #[serde(default)]
    #[validate(range(min = 0))]
    pub time_spent: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResultRequest {
    pub card_id: Uuid,
    pub correct: bool,
    #[serde(default)]
    pub time_spent: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_speed_totals"))]
pub struct SpeedResultRequest {
    pub deck_id: Uuid,
    #[validate(range(min = 0))]
    pub cards_played: i32,
    #[validate(range(min = 0))]
    pub correct_answers: i32,
    #[validate(range(min = 0))]
    pub total_time: i32,
    #[validate(range(min = 0))]
    pub max_streak: i32,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub card_results: Vec<CardResultRequest>,
    #[validate(length(min = 1, max = 128))]
    pub submission_id: Option<String>,
}

fn validate_speed_totals(body: &SpeedResultRequest) -> Result<(), ValidationError> {
    if body.correct_answers > body.cards_played {
        return Err(invalid(
            "correct_exceeds_played",
            "correctAnswers cannot exceed cardsPlayed",
        ));
    }
    if body.card_results.iter().any(|item| item.time_spent < 0) {
        return Err(invalid(
            "negative_time_spent",
            "timeSpent must not be negative",
        ));
    }
    Ok(())
}

impl From<SpeedResultRequest> for SpeedSubmission {
    fn from(body: SpeedResultRequest) -> Self {
        Self {
            deck_id: body.deck_id,
            cards_played: body.cards_played,
            correct_answers: body.correct_answers,
            total_time: body.total_time,
            max_streak: body.max_streak,
            card_results: body
                .card_results
                .into_iter()
                .map(|item| CardOutcome {
                    card_id: item.card_id,
                    correct: item.correct,
                    time_spent: item.time_spent,
                })
                .collect(),
            submission_id: body.submission_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DueQuery {
    pub deck_id: Option<Uuid>,
    #[validate(range(min = 1, max = MAX_DUE_LIMIT))]
    pub limit: Option<u32>,
}
