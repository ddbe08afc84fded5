use sqlx::{Executor, Postgres};

use crate::models::ReviewEvent;

pub async fn insert_review<'e, E>(executor: E, review: &ReviewEvent) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO study_reviews (
                id, user_id, card_id, session_id, speed_result_id, correct, time_spent, reviewed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(review.id)
    .bind(review.user_id)
    .bind(review.card_id)
    .bind(review.session_id)
    .bind(review.speed_result_id)
    .bind(review.correct)
    .bind(review.time_spent)
    .bind(review.reviewed_at)
    .execute(executor)
    .await?;
    Ok(())
}
