use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::SpeedResult;

/// Insert a speed summary unless one with the same `(user_id, dedup_key)` exists.
///
/// Returns `false` when the key was already taken. A concurrent insert of the
/// same key blocks on the unique index until the other transaction finishes.
pub async fn insert_speed_result<'e, E>(
    executor: E,
    result: &SpeedResult,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let inserted = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO speed_results (
                id, user_id, deck_id, cards_played, correct_answers, total_time,
                max_streak, item_count, dedup_key, fingerprint, submitted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id, dedup_key) DO NOTHING
        "#,
    )
    .bind(result.id)
    .bind(result.user_id)
    .bind(result.deck_id)
    .bind(result.cards_played)
    .bind(result.correct_answers)
    .bind(result.total_time)
    .bind(result.max_streak)
    .bind(result.item_count)
    .bind(&result.dedup_key)
    .bind(&result.fingerprint)
    .bind(result.submitted_at)
    .execute(executor)
    .await?;
    Ok(inserted.rows_affected() > 0)
}

pub async fn find_speed_result_by_key<'e, E>(
    executor: E,
    user_id: Uuid,
    dedup_key: &str,
) -> Result<Option<SpeedResult>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, user_id, deck_id, cards_played, correct_answers, total_time,
                   max_streak, item_count, dedup_key, fingerprint, submitted_at
            FROM speed_results
            WHERE user_id = $1 AND dedup_key = $2
        "#,
    )
    .bind(user_id)
    .bind(dedup_key)
    .fetch_optional(executor)
    .await
}

pub async fn list_speed_results<'e, E>(
    executor: E,
    user_id: Uuid,
    deck_id: Option<Uuid>,
) -> Result<Vec<SpeedResult>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, user_id, deck_id, cards_played, correct_answers, total_time,
                   max_streak, item_count, dedup_key, fingerprint, submitted_at
            FROM speed_results
            WHERE user_id = $1
                AND ($2::uuid IS NULL OR deck_id = $2)
            ORDER BY submitted_at DESC, id
        "#,
    )
    .bind(user_id)
    .bind(deck_id)
    .fetch_all(executor)
    .await
}
