use chrono::{DateTime, Utc};
use kards_db::models::DueCard;
use kards_srs::select_due;
use uuid::Uuid;

use super::{
    engine::{Candidate, StudyEngine, require_deck_access},
    error::StudyError,
    store::StudyStore,
};

/// Put store candidates in review order, keeping at most `limit`.
pub(super) fn review_order(
    candidates: Vec<DueCard>,
    now: DateTime<Utc>,
    limit: Option<usize>,
) -> Vec<DueCard> {
    select_due(candidates.into_iter().map(Candidate), now)
        .map(|candidate| candidate.0)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

impl<S: StudyStore> StudyEngine<S> {
    /// Cards the user should review next, in review order.
    ///
    /// Scoped to one deck when `deck_id` is given, otherwise to every card in
    /// the user's decks plus every card the user has progress on. Nothing is
    /// cached: each call reflects the progress stored at `now`.
    pub async fn due_cards(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<DueCard>, StudyError> {
        if let Some(deck_id) = deck_id {
            require_deck_access(self.store().deck_access(user_id, deck_id).await?)?;
        }

        let candidates = self.store().due_cards(user_id, deck_id, now).await?;
        let due = review_order(candidates, now, limit);

        tracing::debug!(%user_id, ?deck_id, count = due.len(), "Selected due cards");
        Ok(due)
    }
}
