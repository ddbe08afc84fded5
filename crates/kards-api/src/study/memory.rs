//! In-process study store.
//!
//! Transactions are serialized behind one async mutex. Each transaction works
//! on a staged copy of the state which replaces the live state only on commit,
//! so a dropped transaction leaves no trace.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use kards_db::models::{
    CardProgress, DeckAccess, DeckOwnership, DueCard, LibraryCounts, ReviewEvent, SpeedResult,
    StudySession,
};
use kards_srs::is_due;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    error::StoreError,
    store::{StudyStore, StudyTx},
};

#[derive(Debug, Clone)]
struct MemoryCard {
    deck_id: Uuid,
    front: String,
    back: String,
    position: i32,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    decks: HashMap<Uuid, DeckOwnership>,
    cards: HashMap<Uuid, MemoryCard>,
    progress: HashMap<(Uuid, Uuid), CardProgress>,
    sessions: HashMap<Uuid, StudySession>,
    speed_results: Vec<SpeedResult>,
    reviews: Vec<ReviewEvent>,
}

impl MemoryState {
    fn deck_access(&self, user_id: Uuid, deck_id: Uuid) -> DeckAccess {
        DeckAccess::resolve(self.decks.get(&deck_id).copied(), user_id)
    }

    fn sessions_of(&self, user_id: Uuid, deck_id: Option<Uuid>) -> Vec<StudySession> {
        let mut sessions: Vec<StudySession> = self
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && deck_id.is_none_or(|deck| s.deck_id == deck))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(a.id.cmp(&b.id)));
        sessions
    }

    fn speed_results_of(&self, user_id: Uuid, deck_id: Option<Uuid>) -> Vec<SpeedResult> {
        let mut results: Vec<SpeedResult> = self
            .speed_results
            .iter()
            .filter(|r| r.user_id == user_id && deck_id.is_none_or(|deck| r.deck_id == deck))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(a.id.cmp(&b.id)));
        results
    }

    fn in_scope(&self, user_id: Uuid, card_id: Uuid, card: &MemoryCard) -> bool {
        let owns_deck = self
            .decks
            .get(&card.deck_id)
            .is_some_and(|deck| deck.owner_id == user_id);
        owns_deck || self.progress.contains_key(&(user_id, card_id))
    }

    fn due_cards(&self, user_id: Uuid, deck_id: Option<Uuid>, now: DateTime<Utc>) -> Vec<DueCard> {
        let mut due: Vec<DueCard> = self
            .cards
            .iter()
            .filter(|(card_id, card)| match deck_id {
                Some(deck_id) => card.deck_id == deck_id,
                None => self.in_scope(user_id, **card_id, card),
            })
            .filter_map(|(card_id, card)| {
                let progress = self.progress.get(&(user_id, *card_id));
                let next_review_date = progress.and_then(|p| p.next_review_date);
                is_due(next_review_date, now).then(|| DueCard {
                    card_id: *card_id,
                    deck_id: card.deck_id,
                    front: card.front.clone(),
                    back: card.back.clone(),
                    position: card.position,
                    mastery_level: progress.map_or(0, |p| p.mastery_level),
                    last_reviewed: progress.and_then(|p| p.last_reviewed),
                    next_review_date,
                })
            })
            .collect();
        due.sort_by_key(|card| card.card_id);
        due
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStudyStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStudyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a deck, standing in for the deck service
    pub async fn insert_deck(&self, deck_id: Uuid, owner_id: Uuid, is_public: bool) {
        self.state.lock().await.decks.insert(
            deck_id,
            DeckOwnership {
                owner_id,
                is_public,
            },
        );
    }

    /// Register a card, standing in for the card service
    pub async fn insert_card(
        &self,
        card_id: Uuid,
        deck_id: Uuid,
        front: &str,
        back: &str,
        position: i32,
    ) {
        self.state.lock().await.cards.insert(
            card_id,
            MemoryCard {
                deck_id,
                front: front.to_string(),
                back: back.to_string(),
                position,
            },
        );
    }

    pub async fn progress(&self, user_id: Uuid, card_id: Uuid) -> Option<CardProgress> {
        self.state
            .lock()
            .await
            .progress
            .get(&(user_id, card_id))
            .cloned()
    }

    pub async fn reviews(&self) -> Vec<ReviewEvent> {
        self.state.lock().await.reviews.clone()
    }
}

pub struct MemoryStudyTx {
    live: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl StudyStore for MemoryStudyStore {
    type Tx = MemoryStudyTx;

    async fn begin(&self) -> Result<MemoryStudyTx, StoreError> {
        let live = Arc::clone(&self.state).lock_owned().await;
        let staged = live.clone();
        Ok(MemoryStudyTx { live, staged })
    }

    async fn deck_access(&self, user_id: Uuid, deck_id: Uuid) -> Result<DeckAccess, StoreError> {
        Ok(self.state.lock().await.deck_access(user_id, deck_id))
    }

    async fn due_cards(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueCard>, StoreError> {
        Ok(self.state.lock().await.due_cards(user_id, deck_id, now))
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<StudySession>, StoreError> {
        Ok(self.state.lock().await.sessions.get(&session_id).cloned())
    }

    async fn list_sessions(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> Result<Vec<StudySession>, StoreError> {
        Ok(self.state.lock().await.sessions_of(user_id, deck_id))
    }

    async fn list_speed_results(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> Result<Vec<SpeedResult>, StoreError> {
        Ok(self.state.lock().await.speed_results_of(user_id, deck_id))
    }

    async fn count_cards_at_level(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        mastery_level: i32,
    ) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let count = state
            .progress
            .values()
            .filter(|p| p.user_id == user_id && p.mastery_level >= mastery_level)
            .filter(|p| {
                deck_id.is_none_or(|deck| {
                    state
                        .cards
                        .get(&p.card_id)
                        .is_some_and(|card| card.deck_id == deck)
                })
            })
            .count();
        Ok(count as i64)
    }

    async fn count_deck_cards(&self, deck_id: Uuid) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        Ok(state.cards.values().filter(|c| c.deck_id == deck_id).count() as i64)
    }

    async fn library_counts(&self, user_id: Uuid) -> Result<LibraryCounts, StoreError> {
        let state = self.state.lock().await;
        let total_decks = state
            .decks
            .values()
            .filter(|deck| deck.owner_id == user_id)
            .count();
        let total_cards = state
            .cards
            .values()
            .filter(|card| {
                state
                    .decks
                    .get(&card.deck_id)
                    .is_some_and(|deck| deck.owner_id == user_id)
            })
            .count();
        Ok(LibraryCounts {
            total_decks: total_decks as i64,
            total_cards: total_cards as i64,
        })
    }
}

impl StudyTx for MemoryStudyTx {
    async fn deck_access(&mut self, user_id: Uuid, deck_id: Uuid) -> Result<DeckAccess, StoreError> {
        Ok(self.staged.deck_access(user_id, deck_id))
    }

    async fn card_deck(&mut self, card_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self.staged.cards.get(&card_id).map(|card| card.deck_id))
    }

    async fn lock_session(&mut self, session_id: Uuid) -> Result<Option<StudySession>, StoreError> {
        Ok(self.staged.sessions.get(&session_id).cloned())
    }

    async fn due_cards(
        &mut self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueCard>, StoreError> {
        Ok(self.staged.due_cards(user_id, deck_id, now))
    }

    async fn list_sessions(
        &mut self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> Result<Vec<StudySession>, StoreError> {
        Ok(self.staged.sessions_of(user_id, deck_id))
    }

    async fn list_speed_results(
        &mut self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
    ) -> Result<Vec<SpeedResult>, StoreError> {
        Ok(self.staged.speed_results_of(user_id, deck_id))
    }

    async fn insert_session(&mut self, session: &StudySession) -> Result<(), StoreError> {
        self.staged.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn update_session(&mut self, session: &StudySession) -> Result<(), StoreError> {
        self.staged.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn lock_progress(
        &mut self,
        user_id: Uuid,
        card_id: Uuid,
    ) -> Result<CardProgress, StoreError> {
        let progress = self
            .staged
            .progress
            .entry((user_id, card_id))
            .or_insert_with(|| CardProgress::new(user_id, card_id));
        Ok(progress.clone())
    }

    async fn update_progress(&mut self, progress: &CardProgress) -> Result<(), StoreError> {
        self.staged
            .progress
            .insert((progress.user_id, progress.card_id), progress.clone());
        Ok(())
    }

    async fn insert_review(&mut self, review: &ReviewEvent) -> Result<(), StoreError> {
        self.staged.reviews.push(review.clone());
        Ok(())
    }

    async fn insert_speed_result(&mut self, result: &SpeedResult) -> Result<bool, StoreError> {
        let taken = self
            .staged
            .speed_results
            .iter()
            .any(|r| r.user_id == result.user_id && r.dedup_key == result.dedup_key);
        if taken {
            return Ok(false);
        }
        self.staged.speed_results.push(result.clone());
        Ok(true)
    }

    async fn find_speed_result(
        &mut self,
        user_id: Uuid,
        dedup_key: &str,
    ) -> Result<Option<SpeedResult>, StoreError> {
        Ok(self
            .staged
            .speed_results
            .iter()
            .find(|r| r.user_id == user_id && r.dedup_key == dedup_key)
            .cloned())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        *self.live = std::mem::take(&mut self.staged);
        Ok(())
    }
}
