use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::StudySession;

pub async fn insert_session<'e, E>(executor: E, session: &StudySession) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO study_sessions (
                id, user_id, deck_id, mode, status, cards_studied, correct_answers,
                total_time, streak, max_streak, started_at, ended_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(session.id)
    .bind(session.user_id)
    .bind(session.deck_id)
    .bind(session.mode)
    .bind(session.status)
    .bind(session.cards_studied)
    .bind(session.correct_answers)
    .bind(session.total_time)
    .bind(session.streak)
    .bind(session.max_streak)
    .bind(session.started_at)
    .bind(session.ended_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_session<'e, E>(
    executor: E,
    session_id: Uuid,
) -> Result<Option<StudySession>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, user_id, deck_id, mode, status, cards_studied, correct_answers,
                   total_time, streak, max_streak, started_at, ended_at
            FROM study_sessions
            WHERE id = $1
        "#,
    )
    .bind(session_id)
    .fetch_optional(executor)
    .await
}

/// Like [`find_session`] but holds a row lock until the transaction ends.
pub async fn lock_session<'e, E>(
    executor: E,
    session_id: Uuid,
) -> Result<Option<StudySession>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, user_id, deck_id, mode, status, cards_studied, correct_answers,
                   total_time, streak, max_streak, started_at, ended_at
            FROM study_sessions
            WHERE id = $1
            FOR UPDATE
        "#,
    )
    .bind(session_id)
    .fetch_optional(executor)
    .await
}

/// Write back counters and lifecycle fields of a session.
pub async fn update_session<'e, E>(executor: E, session: &StudySession) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE study_sessions
            SET status = $2,
                cards_studied = $3,
                correct_answers = $4,
                total_time = $5,
                streak = $6,
                max_streak = $7,
                ended_at = $8
            WHERE id = $1
        "#,
    )
    .bind(session.id)
    .bind(session.status)
    .bind(session.cards_studied)
    .bind(session.correct_answers)
    .bind(session.total_time)
    .bind(session.streak)
    .bind(session.max_streak)
    .bind(session.ended_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// The user's sessions, newest first, optionally limited to one deck.
pub async fn list_sessions<'e, E>(
    executor: E,
    user_id: Uuid,
    deck_id: Option<Uuid>,
) -> Result<Vec<StudySession>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, user_id, deck_id, mode, status, cards_studied, correct_answers,
                   total_time, streak, max_streak, started_at, ended_at
            FROM study_sessions
            WHERE user_id = $1
                AND ($2::uuid IS NULL OR deck_id = $2)
            ORDER BY started_at DESC, id
        "#,
    )
    .bind(user_id)
    .bind(deck_id)
    .fetch_all(executor)
    .await
}
