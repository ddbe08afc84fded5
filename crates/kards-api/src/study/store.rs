//! Storage seam of the study engine.
//!
//! The engine never reaches for a global connection: it is handed a
//! [`StudyStore`] at construction. Reads that need no isolation go straight to
//! the store; every mutation goes through a [`StudyTx`], which must make its
//! writes visible all at once on [`StudyTx::commit`] and discard them when
//! dropped without committing.

use std::future::Future;

use chrono::{DateTime, Utc};
use kards_db::models::{
    CardProgress, DeckAccess, DueCard, LibraryCounts, ReviewEvent, SpeedResult, StudySession,
};
use uuid::Uuid;

use super::error::StoreError;

pub trait StudyStore: Clone + Send + Sync + 'static {
    type Tx: StudyTx;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;

    /// The authorization check shared by every entry point
    fn deck_access(
        &self,
        user_id: Uuid,
        deck_id: Uuid,
    ) -> impl Future<Output = Result<DeckAccess, StoreError>> + Send;

    /// Cards in scope whose progress is absent or due at `now`. Without a deck
    /// the scope is every card in decks the user owns plus every card the user
    /// has progress on.
    fn due_cards(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<DueCard>, StoreError>> + Send;

    fn find_session(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = Result<Option<StudySession>, StoreError>> + Send;

    /// Sessions newest first
    fn list_sessions(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> impl Future<Output = Result<Vec<StudySession>, StoreError>> + Send;

    /// Speed summaries newest first
    fn list_speed_results(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> impl Future<Output = Result<Vec<SpeedResult>, StoreError>> + Send;

    /// Number of the user's cards at or above `mastery_level`
    fn count_cards_at_level(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        mastery_level: i32,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn count_deck_cards(&self, deck_id: Uuid)
    -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn library_counts(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<LibraryCounts, StoreError>> + Send;
}

/// One atomic unit of work.
pub trait StudyTx: Send {
    fn deck_access(
        &mut self,
        user_id: Uuid,
        deck_id: Uuid,
    ) -> impl Future<Output = Result<DeckAccess, StoreError>> + Send;

    /// Deck the card belongs to, if the card exists
    fn card_deck(
        &mut self,
        card_id: Uuid,
    ) -> impl Future<Output = Result<Option<Uuid>, StoreError>> + Send;

    /// Read a session and keep other writers off it until the unit ends
    fn lock_session(
        &mut self,
        session_id: Uuid,
    ) -> impl Future<Output = Result<Option<StudySession>, StoreError>> + Send;

    /// Same scope and filter as [`StudyStore::due_cards`], read inside the unit
    fn due_cards(
        &mut self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<DueCard>, StoreError>> + Send;

    /// Sessions newest first, including writes staged in this unit
    fn list_sessions(
        &mut self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> impl Future<Output = Result<Vec<StudySession>, StoreError>> + Send;

    /// Speed summaries newest first, including writes staged in this unit
    fn list_speed_results(
        &mut self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> impl Future<Output = Result<Vec<SpeedResult>, StoreError>> + Send;

    fn insert_session(
        &mut self,
        session: &StudySession,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_session(
        &mut self,
        session: &StudySession,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read a card's progress, creating an empty record when none exists, and
    /// keep other writers off it until the unit ends
    fn lock_progress(
        &mut self,
        user_id: Uuid,
        card_id: Uuid,
    ) -> impl Future<Output = Result<CardProgress, StoreError>> + Send;

    fn update_progress(
        &mut self,
        progress: &CardProgress,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn insert_review(
        &mut self,
        review: &ReviewEvent,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns `false`, writing nothing, when the user already has a summary
    /// with the same dedup key
    fn insert_speed_result(
        &mut self,
        result: &SpeedResult,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn find_speed_result(
        &mut self,
        user_id: Uuid,
        dedup_key: &str,
    ) -> impl Future<Output = Result<Option<SpeedResult>, StoreError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
