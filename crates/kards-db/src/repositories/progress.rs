use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::CardProgress;

/// Insert an empty progress row unless one exists.
///
/// Used before [`lock_card_progress`] so that the very first review of a card
/// also has a row to lock: two concurrent first reviews then serialize on the
/// row instead of both reading "no progress".
pub async fn ensure_card_progress<'e, E>(
    executor: E,
    user_id: Uuid,
    card_id: Uuid,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO card_progress (user_id, card_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, card_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(card_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Read a progress row and hold a row lock until the transaction ends.
pub async fn lock_card_progress<'e, E>(
    executor: E,
    user_id: Uuid,
    card_id: Uuid,
) -> Result<CardProgress, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT user_id, card_id, review_count, correct_count, mastery_level,
                   last_reviewed, next_review_date
            FROM card_progress
            WHERE user_id = $1 AND card_id = $2
            FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(card_id)
    .fetch_one(executor)
    .await
}

pub async fn update_card_progress<'e, E>(
    executor: E,
    progress: &CardProgress,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE card_progress
            SET review_count = $3,
                correct_count = $4,
                mastery_level = $5,
                last_reviewed = $6,
                next_review_date = $7,
                updated_at = NOW()
            WHERE user_id = $1 AND card_id = $2
        "#,
    )
    .bind(progress.user_id)
    .bind(progress.card_id)
    .bind(progress.review_count)
    .bind(progress.correct_count)
    .bind(progress.mastery_level)
    .bind(progress.last_reviewed)
    .bind(progress.next_review_date)
    .execute(executor)
    .await?;
    Ok(())
}

/// Count the user's cards at or above `mastery_level`, optionally within one deck.
pub async fn count_cards_at_level<'e, E>(
    executor: E,
    user_id: Uuid,
    deck_id: Option<Uuid>,
    mastery_level: i32,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*)
            FROM card_progress cp
            JOIN cards c ON c.id = cp.card_id
            WHERE cp.user_id = $1
                AND cp.mastery_level >= $3
                AND ($2::uuid IS NULL OR c.deck_id = $2)
        "#,
    )
    .bind(user_id)
    .bind(deck_id)
    .bind(mastery_level)
    .fetch_one(executor)
    .await
}
