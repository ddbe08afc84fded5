//! Postgres implementation of the study store.

use chrono::{DateTime, Utc};
use kards_db::{
    models::{
        CardProgress, DeckAccess, DueCard, LibraryCounts, ReviewEvent, SpeedResult, StudySession,
    },
    repositories::{deck, progress, review, session, speed},
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    error::StoreError,
    store::{StudyStore, StudyTx},
};

#[derive(Clone, Debug)]
pub struct PgStudyStore {
    pool: PgPool,
}

impl PgStudyStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A Postgres transaction. Dropping it without [`StudyTx::commit`] rolls back.
pub struct PgStudyTx {
    tx: Transaction<'static, Postgres>,
}

impl StudyStore for PgStudyStore {
    type Tx = PgStudyTx;

    async fn begin(&self) -> Result<PgStudyTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgStudyTx { tx })
    }

    async fn deck_access(&self, user_id: Uuid, deck_id: Uuid) -> Result<DeckAccess, StoreError> {
        let ownership = deck::find_ownership(&self.pool, deck_id).await?;
        Ok(DeckAccess::resolve(ownership, user_id))
    }

    async fn due_cards(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueCard>, StoreError> {
        let cards = match deck_id {
            Some(deck_id) => deck::get_due_cards_for_deck(&self.pool, user_id, deck_id, now).await?,
            None => deck::get_due_cards_for_user(&self.pool, user_id, now).await?,
        };
        Ok(cards)
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<StudySession>, StoreError> {
        Ok(session::find_session(&self.pool, session_id).await?)
    }

    async fn list_sessions(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> Result<Vec<StudySession>, StoreError> {
        Ok(session::list_sessions(&self.pool, user_id, deck_id).await?)
    }

    async fn list_speed_results(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> Result<Vec<SpeedResult>, StoreError> {
        Ok(speed::list_speed_results(&self.pool, user_id, deck_id).await?)
    }

    async fn count_cards_at_level(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        mastery_level: i32,
    ) -> Result<i64, StoreError> {
        Ok(progress::count_cards_at_level(&self.pool, user_id, deck_id, mastery_level).await?)
    }

    async fn count_deck_cards(&self, deck_id: Uuid) -> Result<i64, StoreError> {
        Ok(deck::count_deck_cards(&self.pool, deck_id).await?)
    }

    async fn library_counts(&self, user_id: Uuid) -> Result<LibraryCounts, StoreError> {
        Ok(deck::get_library_counts(&self.pool, user_id).await?)
    }
}

impl StudyTx for PgStudyTx {
    async fn deck_access(&mut self, user_id: Uuid, deck_id: Uuid) -> Result<DeckAccess, StoreError> {
        let ownership = deck::find_ownership(&mut *self.tx, deck_id).await?;
        Ok(DeckAccess::resolve(ownership, user_id))
    }

    async fn card_deck(&mut self, card_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(deck::find_card_deck(&mut *self.tx, card_id).await?)
    }

    async fn lock_session(&mut self, session_id: Uuid) -> Result<Option<StudySession>, StoreError> {
        Ok(session::lock_session(&mut *self.tx, session_id).await?)
    }

    async fn due_cards(
        &mut self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueCard>, StoreError> {
        let cards = match deck_id {
            Some(deck_id) => {
                deck::get_due_cards_for_deck(&mut *self.tx, user_id, deck_id, now).await?
            }
            None => deck::get_due_cards_for_user(&mut *self.tx, user_id, now).await?,
        };
        Ok(cards)
    }

    async fn list_sessions(
        &mut self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> Result<Vec<StudySession>, StoreError> {
        Ok(session::list_sessions(&mut *self.tx, user_id, deck_id).await?)
    }

    async fn list_speed_results(
        &mut self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> Result<Vec<SpeedResult>, StoreError> {
        Ok(speed::list_speed_results(&mut *self.tx, user_id, deck_id).await?)
    }

    async fn insert_session(&mut self, study_session: &StudySession) -> Result<(), StoreError> {
        Ok(session::insert_session(&mut *self.tx, study_session).await?)
    }

    async fn update_session(&mut self, study_session: &StudySession) -> Result<(), StoreError> {
        Ok(session::update_session(&mut *self.tx, study_session).await?)
    }

    async fn lock_progress(
        &mut self,
        user_id: Uuid,
        card_id: Uuid,
    ) -> Result<CardProgress, StoreError> {
        progress::ensure_card_progress(&mut *self.tx, user_id, card_id).await?;
        Ok(progress::lock_card_progress(&mut *self.tx, user_id, card_id).await?)
    }

    async fn update_progress(&mut self, card_progress: &CardProgress) -> Result<(), StoreError> {
        Ok(progress::update_card_progress(&mut *self.tx, card_progress).await?)
    }

    async fn insert_review(&mut self, event: &ReviewEvent) -> Result<(), StoreError> {
        Ok(review::insert_review(&mut *self.tx, event).await?)
    }

    async fn insert_speed_result(&mut self, result: &SpeedResult) -> Result<bool, StoreError> {
        Ok(speed::insert_speed_result(&mut *self.tx, result).await?)
    }

    async fn find_speed_result(
        &mut self,
        user_id: Uuid,
        dedup_key: &str,
    ) -> Result<Option<SpeedResult>, StoreError> {
        Ok(speed::find_speed_result_by_key(&mut *self.tx, user_id, dedup_key).await?)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
