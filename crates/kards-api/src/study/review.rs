use chrono::{DateTime, Utc};
use kards_db::models::{CardProgress, ReviewEvent};
use uuid::Uuid;

use super::{
    engine::{StudyEngine, require_deck_access, schedule},
    error::{Resource, StudyError},
    store::{StudyStore, StudyTx},
};
use crate::metrics;

impl<S: StudyStore> StudyEngine<S> {
    /// Record one review inside an active session.
    ///
    /// The progress update, the session counters and the review event are
    /// written in one transaction. The progress row stays locked from read to
    /// write, so concurrent reviews of the same card from several devices are
    /// applied one after the other and none is lost.
    pub async fn review_card(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        card_id: Uuid,
        correct: bool,
        time_spent: i32,
        now: DateTime<Utc>,
    ) -> Result<CardProgress, StudyError> {
        if time_spent < 0 {
            return Err(StudyError::Validation(
                "timeSpent must not be negative".to_string(),
            ));
        }

        let mut tx = self.store().begin().await?;
        let mut session = tx
            .lock_session(session_id)
            .await?
            .ok_or(StudyError::NotFound(Resource::Session))?;
        if session.user_id != user_id {
            return Err(StudyError::Forbidden(Resource::Session));
        }
        if !session.is_active() {
            return Err(StudyError::Conflict(
                "cannot review a card in an ended session".to_string(),
            ));
        }
        require_deck_access(tx.deck_access(user_id, session.deck_id).await?)?;

        // A card from another deck is reported as missing from this one
        match tx.card_deck(card_id).await? {
            Some(deck_id) if deck_id == session.deck_id => {}
            _ => return Err(StudyError::NotFound(Resource::Card)),
        }

        let progress = tx.lock_progress(user_id, card_id).await?;
        let progress = schedule(&progress, correct, now);
        tx.update_progress(&progress).await?;

        session.cards_studied = session.cards_studied.saturating_add(1);
        if correct {
            session.correct_answers = session.correct_answers.saturating_add(1);
            session.streak = session.streak.saturating_add(1);
        } else {
            session.streak = 0;
        }
        session.total_time = session.total_time.saturating_add(time_spent);
        session.max_streak = session.max_streak.max(session.streak);
        tx.update_session(&session).await?;

        tx.insert_review(&ReviewEvent {
            id: Uuid::new_v4(),
            user_id,
            card_id,
            session_id: Some(session_id),
            speed_result_id: None,
            correct,
            time_spent,
            reviewed_at: now,
        })
        .await?;
        tx.commit().await?;

        metrics::record_review(correct);
        tracing::debug!(
            %session_id,
            %card_id,
            correct,
            mastery_level = progress.mastery_level,
            "Card reviewed"
        );

        Ok(progress)
    }
}
