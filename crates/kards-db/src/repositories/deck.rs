use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{DeckOwnership, DueCard, LibraryCounts};

pub async fn find_ownership<'e, E>(
    executor: E,
    deck_id: Uuid,
) -> Result<Option<DeckOwnership>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT owner_id, is_public
            FROM decks
            WHERE id = $1
        "#,
    )
    .bind(deck_id)
    .fetch_optional(executor)
    .await
}

/// Deck the card belongs to, if the card exists.
pub async fn find_card_deck<'e, E>(executor: E, card_id: Uuid) -> Result<Option<Uuid>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT deck_id
            FROM cards
            WHERE id = $1
        "#,
    )
    .bind(card_id)
    .fetch_optional(executor)
    .await
}

/// Cards of one deck whose progress for the user is absent or due at `now`.
pub async fn get_due_cards_for_deck<'e, E>(
    executor: E,
    user_id: Uuid,
    deck_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<DueCard>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                c.id AS card_id,
                c.deck_id,
                c.front,
                c.back,
                c.position,
                COALESCE(cp.mastery_level, 0) AS mastery_level,
                cp.last_reviewed,
                cp.next_review_date
            FROM cards c
            LEFT JOIN card_progress cp
                ON cp.card_id = c.id AND cp.user_id = $1
            WHERE c.deck_id = $2
                AND (cp.next_review_date IS NULL OR cp.next_review_date <= $3)
            ORDER BY COALESCE(cp.mastery_level, 0), cp.last_reviewed NULLS FIRST, c.position, c.id
        "#,
    )
    .bind(user_id)
    .bind(deck_id)
    .bind(now)
    .fetch_all(executor)
    .await
}

/// Due cards across the user's card set: every card in decks the user owns
/// plus every card the user already has progress on.
pub async fn get_due_cards_for_user<'e, E>(
    executor: E,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<DueCard>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                c.id AS card_id,
                c.deck_id,
                c.front,
                c.back,
                c.position,
                COALESCE(cp.mastery_level, 0) AS mastery_level,
                cp.last_reviewed,
                cp.next_review_date
            FROM cards c
            JOIN decks d ON d.id = c.deck_id
            LEFT JOIN card_progress cp
                ON cp.card_id = c.id AND cp.user_id = $1
            WHERE (d.owner_id = $1 OR cp.user_id IS NOT NULL)
                AND (cp.next_review_date IS NULL OR cp.next_review_date <= $2)
            ORDER BY COALESCE(cp.mastery_level, 0), cp.last_reviewed NULLS FIRST, c.position, c.id
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_all(executor)
    .await
}

pub async fn count_deck_cards<'e, E>(executor: E, deck_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*)
            FROM cards
            WHERE deck_id = $1
        "#,
    )
    .bind(deck_id)
    .fetch_one(executor)
    .await
}

/// Decks owned by the user and the cards in them.
pub async fn get_library_counts<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<LibraryCounts, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                COUNT(DISTINCT d.id) AS total_decks,
                COUNT(c.id) AS total_cards
            FROM decks d
            LEFT JOIN cards c ON c.deck_id = d.id
            WHERE d.owner_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}
