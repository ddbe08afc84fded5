//! Read-only statistics derived from session and speed run history.
//!
//! Calendar days are the server's local days. A day counts toward streaks when
//! a session that studied at least one card started on it, or a speed run with
//! at least one card played was submitted on it.

use chrono::{DateTime, Local, NaiveDate, Utc};
use kards_db::models::{SpeedResult, StudySession};
use kards_srs::{MAX_LEVEL, StreakSummary, summarize_streaks, trailing_week};
use serde::Serialize;
use uuid::Uuid;

use super::{
    engine::{StudyEngine, require_deck_access},
    error::StudyError,
    store::{StudyStore, StudyTx},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_decks: i64,
    pub total_cards: i64,
    pub cards_studied_today: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Seconds
    pub total_study_time: i64,
    /// Fraction of correct answers in `[0, 1]`, four decimals
    pub average_accuracy: f64,
    pub mastered_cards: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyActivity {
    pub date: NaiveDate,
    pub cards_studied: i64,
    /// Seconds
    pub time_spent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckAnalytics {
    pub deck_id: Uuid,
    pub total_cards: i64,
    /// Sessions plus speed runs
    pub sessions_count: i64,
    pub cards_studied: i64,
    pub correct_answers: i64,
    pub average_accuracy: f64,
    pub total_study_time: i64,
    pub mastered_cards: i64,
    pub due_cards: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_studied_at: Option<DateTime<Utc>>,
}

/// One study run reduced to what the aggregates need
#[derive(Debug, Clone, Copy)]
struct Activity {
    day: NaiveDate,
    at: DateTime<Utc>,
    cards: i64,
    correct: i64,
    time: i64,
}

fn local_day(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

fn history(sessions: &[StudySession], speed_results: &[SpeedResult]) -> Vec<Activity> {
    let sessions = sessions.iter().map(|session| Activity {
        day: local_day(session.started_at),
        at: session.ended_at.unwrap_or(session.started_at),
        cards: session.cards_studied.into(),
        correct: session.correct_answers.into(),
        time: session.total_time.into(),
    });
    let speed = speed_results.iter().map(|result| Activity {
        day: local_day(result.submitted_at),
        at: result.submitted_at,
        cards: result.cards_played.into(),
        correct: result.correct_answers.into(),
        time: result.total_time.into(),
    });
    sessions.chain(speed).collect()
}

fn streaks(history: &[Activity], today: NaiveDate) -> StreakSummary {
    summarize_streaks(
        history
            .iter()
            .filter(|activity| activity.cards > 0)
            .map(|activity| activity.day),
        today,
    )
}

fn accuracy(correct: i64, studied: i64) -> f64 {
    if studied <= 0 {
        return 0.0;
    }
    let ratio = (correct as f64 / studied as f64).clamp(0.0, 1.0);
    (ratio * 10_000.0).round() / 10_000.0
}

/// Account streaks over the user's full history, read inside an open unit so
/// the result reflects its staged writes.
pub(super) async fn account_streaks<T: StudyTx>(
    tx: &mut T,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<StreakSummary, StudyError> {
    let sessions = tx.list_sessions(user_id, None).await?;
    let speed_results = tx.list_speed_results(user_id, None).await?;
    Ok(streaks(&history(&sessions, &speed_results), local_day(now)))
}

impl<S: StudyStore> StudyEngine<S> {
    async fn user_history(&self, user_id: Uuid) -> Result<Vec<Activity>, StudyError> {
        let sessions = self.store().list_sessions(user_id, None).await?;
        let speed_results = self.store().list_speed_results(user_id, None).await?;
        Ok(history(&sessions, &speed_results))
    }

    pub async fn user_analytics(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<UserStats, StudyError> {
        let library = self.store().library_counts(user_id).await?;
        let mastered_cards = self
            .store()
            .count_cards_at_level(user_id, None, MAX_LEVEL)
            .await?;
        let history = self.user_history(user_id).await?;
        let today = local_day(now);

        let streak = streaks(&history, today);
        let cards_studied_today = history
            .iter()
            .filter(|activity| activity.day == today)
            .map(|activity| activity.cards)
            .sum();
        let studied: i64 = history.iter().map(|activity| activity.cards).sum();
        let correct: i64 = history.iter().map(|activity| activity.correct).sum();

        tracing::debug!(%user_id, runs = history.len(), "Computed user analytics");

        Ok(UserStats {
            total_decks: library.total_decks,
            total_cards: library.total_cards,
            cards_studied_today,
            current_streak: streak.current,
            longest_streak: streak.longest,
            total_study_time: history.iter().map(|activity| activity.time).sum(),
            average_accuracy: accuracy(correct, studied),
            mastered_cards,
        })
    }

    /// The seven days ending today, oldest first, zero filled.
    pub async fn weekly_breakdown(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<WeeklyActivity>, StudyError> {
        let history = self.user_history(user_id).await?;

        Ok(trailing_week(local_day(now))
            .into_iter()
            .map(|date| {
                let day = history.iter().filter(|activity| activity.day == date);
                WeeklyActivity {
                    date,
                    cards_studied: day.clone().map(|activity| activity.cards).sum(),
                    time_spent: day.map(|activity| activity.time).sum(),
                }
            })
            .collect())
    }

    /// Statistics for one deck, or `None` when the user never studied it.
    pub async fn deck_analytics(
        &self,
        user_id: Uuid,
        deck_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<DeckAnalytics>, StudyError> {
        require_deck_access(self.store().deck_access(user_id, deck_id).await?)?;

        let sessions = self.store().list_sessions(user_id, Some(deck_id)).await?;
        let speed_results = self
            .store()
            .list_speed_results(user_id, Some(deck_id))
            .await?;
        if sessions.is_empty() && speed_results.is_empty() {
            return Ok(None);
        }
        let history = history(&sessions, &speed_results);

        let total_cards = self.store().count_deck_cards(deck_id).await?;
        let mastered_cards = self
            .store()
            .count_cards_at_level(user_id, Some(deck_id), MAX_LEVEL)
            .await?;
        let due_cards = self
            .store()
            .due_cards(user_id, Some(deck_id), now)
            .await?
            .len();

        let streak = streaks(&history, local_day(now));
        let cards_studied: i64 = history.iter().map(|activity| activity.cards).sum();
        let correct_answers: i64 = history.iter().map(|activity| activity.correct).sum();

        Ok(Some(DeckAnalytics {
            deck_id,
            total_cards,
            sessions_count: history.len() as i64,
            cards_studied,
            correct_answers,
            average_accuracy: accuracy(correct_answers, cards_studied),
            total_study_time: history.iter().map(|activity| activity.time).sum(),
            mastered_cards,
            due_cards: due_cards as i64,
            current_streak: streak.current,
            longest_streak: streak.longest,
            last_studied_at: history.iter().map(|activity| activity.at).max(),
        }))
    }
}
