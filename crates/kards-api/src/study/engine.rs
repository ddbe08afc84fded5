use chrono::{DateTime, Utc};
use kards_db::models::{CardProgress, DeckAccess, DueCard, StudySession};
use kards_srs::{DueCandidate, ProgressState, apply_review};
use uuid::Uuid;

use super::{
    error::{Resource, StudyError},
    store::StudyStore,
};

/// Entry point of every study operation.
///
/// The engine holds nothing but its store; each call re-reads what it needs.
/// Operations are split across the sibling modules by concern.
#[derive(Clone, Debug)]
pub struct StudyEngine<S> {
    store: S,
}

impl<S: StudyStore> StudyEngine<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }
}

/// Turn a deck access decision into an error for anything but owner/public.
pub(super) fn require_deck_access(access: DeckAccess) -> Result<(), StudyError> {
    match access {
        DeckAccess::Owner | DeckAccess::Public => Ok(()),
        DeckAccess::Denied => Err(StudyError::Forbidden(Resource::Deck)),
        DeckAccess::Missing => Err(StudyError::NotFound(Resource::Deck)),
    }
}

/// Ownership check on a session read outside a transaction.
pub(super) fn owned_session(
    session: Option<StudySession>,
    user_id: Uuid,
) -> Result<StudySession, StudyError> {
    let session = session.ok_or(StudyError::NotFound(Resource::Session))?;
    if session.user_id != user_id {
        return Err(StudyError::Forbidden(Resource::Session));
    }
    Ok(session)
}

/// Apply one review outcome to a stored progress row.
pub(super) fn schedule(progress: &CardProgress, correct: bool, now: DateTime<Utc>) -> CardProgress {
    let state = ProgressState {
        review_count: progress.review_count,
        correct_count: progress.correct_count,
        mastery_level: progress.mastery_level,
        last_reviewed: progress.last_reviewed,
        next_review_date: progress.next_review_date,
    };
    let next = apply_review(&state, correct, now);

    CardProgress {
        user_id: progress.user_id,
        card_id: progress.card_id,
        review_count: next.review_count,
        correct_count: next.correct_count,
        mastery_level: next.mastery_level,
        last_reviewed: next.last_reviewed,
        next_review_date: next.next_review_date,
    }
}

/// Due-ordering view of a stored due card.
pub(super) struct Candidate(pub DueCard);

impl DueCandidate for Candidate {
    fn mastery_level(&self) -> i32 {
        self.0.mastery_level
    }

    fn last_reviewed(&self) -> Option<DateTime<Utc>> {
        self.0.last_reviewed
    }

    fn next_review_date(&self) -> Option<DateTime<Utc>> {
        self.0.next_review_date
    }

    fn position(&self) -> i32 {
        self.0.position
    }
}
