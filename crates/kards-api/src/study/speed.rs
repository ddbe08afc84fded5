use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use kards_db::models::{ReviewEvent, SpeedResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{
    engine::{StudyEngine, require_deck_access, schedule},
    error::{Resource, StudyError},
    store::{StudyStore, StudyTx},
};
use crate::metrics;

/// Largest number of itemized card outcomes accepted in one batch
pub const MAX_CARD_RESULTS: usize = 1000;
/// Longest accepted client submission id
pub const MAX_SUBMISSION_ID_LEN: usize = 128;

/// Outcome for one card inside a speed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardOutcome {
    pub card_id: Uuid,
    pub correct: bool,
    /// Seconds spent on the card
    pub time_spent: i32,
}

/// A finished speed run as submitted by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedSubmission {
    pub deck_id: Uuid,
    pub cards_played: i32,
    pub correct_answers: i32,
    pub total_time: i32,
    pub max_streak: i32,
    /// Applied in order; the same card may appear more than once
    pub card_results: Vec<CardOutcome>,
    /// Client idempotency key
    pub submission_id: Option<String>,
}

/// Acknowledgement of a speed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedAck {
    pub speed_result_id: Uuid,
    /// The batch had already been applied; nothing changed
    pub duplicate: bool,
    /// Distinct cards whose progress the batch changed
    pub cards_updated: i32,
}

impl SpeedSubmission {
    fn validate(&self) -> Result<(), StudyError> {
        let counters = [
            self.cards_played,
            self.correct_answers,
            self.total_time,
            self.max_streak,
        ];
        if counters.iter().any(|value| *value < 0) {
            return Err(StudyError::Validation(
                "counters must not be negative".to_string(),
            ));
        }
        if self.correct_answers > self.cards_played {
            return Err(StudyError::Validation(
                "correctAnswers cannot exceed cardsPlayed".to_string(),
            ));
        }
        if self.card_results.len() > MAX_CARD_RESULTS {
            return Err(StudyError::Validation(format!(
                "at most {MAX_CARD_RESULTS} card results per submission"
            )));
        }
        if self.card_results.iter().any(|item| item.time_spent < 0) {
            return Err(StudyError::Validation(
                "timeSpent must not be negative".to_string(),
            ));
        }
        if let Some(id) = &self.submission_id
            && (id.is_empty() || id.len() > MAX_SUBMISSION_ID_LEN)
        {
            return Err(StudyError::Validation(format!(
                "submissionId must be 1 to {MAX_SUBMISSION_ID_LEN} characters"
            )));
        }
        Ok(())
    }

    /// SHA-256 of the summary and the itemized outcomes in submission order,
    /// hex encoded. The submission id is not part of it.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.deck_id.as_bytes());
        for counter in [
            self.cards_played,
            self.correct_answers,
            self.total_time,
            self.max_streak,
        ] {
            hasher.update(counter.to_be_bytes());
        }
        hasher.update((self.card_results.len() as u64).to_be_bytes());
        for item in &self.card_results {
            hasher.update(item.card_id.as_bytes());
            hasher.update([u8::from(item.correct)]);
            hasher.update(item.time_spent.to_be_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl<S: StudyStore> StudyEngine<S> {
    /// Apply a speed run as one atomic batch.
    ///
    /// The summary row is written first under the batch's dedup key, which is
    /// the client submission id or, without one, the fingerprint. A retry of
    /// an applied batch is acknowledged as a duplicate without touching
    /// progress; reusing a key for a different payload is a conflict.
    pub async fn submit_speed_results(
        &self,
        user_id: Uuid,
        submission: SpeedSubmission,
        now: DateTime<Utc>,
    ) -> Result<SpeedAck, StudyError> {
        submission.validate()?;
        let fingerprint = submission.fingerprint();
        let dedup_key = submission
            .submission_id
            .clone()
            .unwrap_or_else(|| fingerprint.clone());
        let deck_id = submission.deck_id;

        let mut tx = self.store().begin().await?;
        require_deck_access(tx.deck_access(user_id, deck_id).await?)?;

        let item_count = i32::try_from(submission.card_results.len())
            .map_err(|_| StudyError::Validation("too many card results".to_string()))?;
        let cards: BTreeSet<Uuid> = submission
            .card_results
            .iter()
            .map(|item| item.card_id)
            .collect();
        // Bounded by the item count
        let cards_updated = cards.len() as i32;
        let summary = SpeedResult {
            id: Uuid::new_v4(),
            user_id,
            deck_id,
            cards_played: submission.cards_played,
            correct_answers: submission.correct_answers,
            total_time: submission.total_time,
            max_streak: submission.max_streak,
            item_count,
            dedup_key,
            fingerprint,
            submitted_at: now,
        };

        if !tx.insert_speed_result(&summary).await? {
            let existing = tx
                .find_speed_result(user_id, &summary.dedup_key)
                .await?
                .ok_or_else(|| {
                    StudyError::Conflict("speed submission is being applied".to_string())
                })?;
            if existing.fingerprint != summary.fingerprint {
                metrics::record_speed_submission("conflict");
                return Err(StudyError::Conflict(
                    "submissionId was already used for a different payload".to_string(),
                ));
            }
            metrics::record_speed_submission("duplicate");
            tracing::info!(
                speed_result_id = %existing.id,
                %user_id,
                "Duplicate speed submission acknowledged"
            );
            return Ok(SpeedAck {
                speed_result_id: existing.id,
                duplicate: true,
                cards_updated,
            });
        }

        for card_id in &cards {
            match tx.card_deck(*card_id).await? {
                Some(card_deck) if card_deck == deck_id => {}
                _ => return Err(StudyError::NotFound(Resource::Card)),
            }
        }

        // Lock in ascending card id order
        let mut progress = BTreeMap::new();
        for card_id in cards {
            progress.insert(card_id, tx.lock_progress(user_id, card_id).await?);
        }

        for item in &submission.card_results {
            if let Some(current) = progress.get_mut(&item.card_id) {
                *current = schedule(current, item.correct, now);
            }
            tx.insert_review(&ReviewEvent {
                id: Uuid::new_v4(),
                user_id,
                card_id: item.card_id,
                session_id: None,
                speed_result_id: Some(summary.id),
                correct: item.correct,
                time_spent: item.time_spent,
                reviewed_at: now,
            })
            .await?;
        }
        for updated in progress.values() {
            tx.update_progress(updated).await?;
        }
        tx.commit().await?;

        metrics::record_speed_submission("applied");
        tracing::info!(
            speed_result_id = %summary.id,
            %user_id,
            %deck_id,
            items = item_count,
            "Speed batch applied"
        );

        Ok(SpeedAck {
            speed_result_id: summary.id,
            duplicate: false,
            cards_updated,
        })
    }
}
