use chrono::{DateTime, Utc};
use kards_db::models::{SessionStatus, StudyMode, StudySession};
use serde::Serialize;
use uuid::Uuid;

use super::{
    analytics::account_streaks,
    due::review_order,
    engine::{StudyEngine, owned_session, require_deck_access},
    error::{Resource, StudyError},
    store::{StudyStore, StudyTx},
};
use crate::metrics;

/// A freshly created session together with the cards currently due in its deck
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    #[serde(flatten)]
    pub session: StudySession,
    pub due_card_ids: Vec<Uuid>,
}

/// Totals reported by the client when it closes a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalCounters {
    pub cards_studied: i32,
    pub correct_answers: i32,
    pub total_time: i32,
    /// In-session streak at the end; the accumulated one is kept when absent
    pub streak: Option<i32>,
}

/// An ended session and the account streak recomputed after ending it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnded {
    #[serde(flatten)]
    pub session: StudySession,
    pub current_streak: u32,
}

impl FinalCounters {
    fn validate(&self) -> Result<(), StudyError> {
        let negative = [self.cards_studied, self.correct_answers, self.total_time]
            .into_iter()
            .chain(self.streak)
            .any(|value| value < 0);
        if negative {
            return Err(StudyError::Validation(
                "counters must not be negative".to_string(),
            ));
        }
        if self.correct_answers > self.cards_studied {
            return Err(StudyError::Validation(
                "correctAnswers cannot exceed cardsStudied".to_string(),
            ));
        }
        Ok(())
    }
}

impl<S: StudyStore> StudyEngine<S> {
    /// Open a new active session on a deck the user may study.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        deck_id: Uuid,
        mode: StudyMode,
        now: DateTime<Utc>,
    ) -> Result<SessionStarted, StudyError> {
        let mut tx = self.store().begin().await?;
        require_deck_access(tx.deck_access(user_id, deck_id).await?)?;

        let session = StudySession::start(Uuid::new_v4(), user_id, deck_id, mode, now);
        tx.insert_session(&session).await?;
        let due = tx.due_cards(user_id, Some(deck_id), now).await?;
        let due_card_ids = review_order(due, now, None)
            .into_iter()
            .map(|card| card.card_id)
            .collect();
        tx.commit().await?;

        tracing::info!(
            session_id = %session.id,
            %user_id,
            %deck_id,
            ?mode,
            "Study session created"
        );
        metrics::record_session_event("created");

        Ok(SessionStarted {
            session,
            due_card_ids,
        })
    }

    /// End an active session, reconciling the client's totals with the ones
    /// accumulated from individual reviews.
    ///
    /// Each counter keeps the larger of the two values, so totals never go
    /// down. An ended session is immutable and ending it again is a conflict.
    pub async fn end_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        counters: FinalCounters,
        now: DateTime<Utc>,
    ) -> Result<SessionEnded, StudyError> {
        counters.validate()?;

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
                "session has already ended".to_string(),
            ));
        }

        session.cards_studied = session.cards_studied.max(counters.cards_studied);
        session.correct_answers = session.correct_answers.max(counters.correct_answers);
        session.total_time = session.total_time.max(counters.total_time);
        session.streak = counters.streak.unwrap_or(session.streak);
        session.max_streak = session.max_streak.max(session.streak);
        session.status = SessionStatus::Ended;
        session.ended_at = Some(now);

        tx.update_session(&session).await?;
        let streaks = account_streaks(&mut tx, user_id, now).await?;
        tx.commit().await?;
        metrics::record_session_event("ended");

        tracing::info!(
            %session_id,
            %user_id,
            cards_studied = session.cards_studied,
            correct_answers = session.correct_answers,
            current_streak = streaks.current,
            "Study session ended"
        );

        Ok(SessionEnded {
            session,
            current_streak: streaks.current,
        })
    }

    /// The user's sessions, newest first.
    pub async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<StudySession>, StudyError> {
        let sessions = self.store().list_sessions(user_id, None).await?;
        tracing::debug!(%user_id, count = sessions.len(), "Listed study sessions");
        Ok(sessions)
    }

    pub async fn get_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<StudySession, StudyError> {
        owned_session(self.store().find_session(session_id).await?, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::{
        engine::fixtures::{library, noon},
        error::StoreError,
        memory::{MemoryStudyStore, MemoryStudyTx},
    };
    use chrono::Duration;
    use kards_db::models::{DeckAccess, DueCard, LibraryCounts, SpeedResult};

    #[tokio::test]
    async fn test_create_session_returns_due_cards() {
        let lib = library().await;

        let started = lib
            .engine
            .create_session(lib.owner, lib.deck, StudyMode::Normal, noon())
            .await
            .unwrap();

        assert_eq!(started.session.status, SessionStatus::Active);
        assert_eq!(started.session.cards_studied, 0);
        assert_eq!(started.session.ended_at, None);
        // Never reviewed cards come out in deck position order
        assert_eq!(started.due_card_ids, lib.cards);
    }

    #[tokio::test]
    async fn test_create_session_on_public_deck_of_other_user() {
        let lib = library().await;

        let started = lib
            .engine
            .create_session(lib.stranger, lib.deck, StudyMode::Ghost, noon())
            .await
            .unwrap();
        assert_eq!(started.session.user_id, lib.stranger);
        assert_eq!(started.session.mode, StudyMode::Ghost);
    }

    #[tokio::test]
    async fn test_create_session_access_denied() {
        let lib = library().await;

        let private = lib
            .engine
            .create_session(lib.owner, lib.private_deck, StudyMode::Normal, noon())
            .await;
        assert!(matches!(
            private,
            Err(StudyError::Forbidden(Resource::Deck))
        ));

        let missing = lib
            .engine
            .create_session(lib.owner, Uuid::new_v4(), StudyMode::Normal, noon())
            .await;
        assert!(matches!(missing, Err(StudyError::NotFound(Resource::Deck))));
        assert!(lib.engine.list_sessions(lib.owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_end_speed_session() {
        let lib = library().await;
        let started = lib
            .engine
            .create_session(lib.owner, lib.deck, StudyMode::Speed, noon())
            .await
            .unwrap();

        let counters = FinalCounters {
            cards_studied: 20,
            correct_answers: 18,
            total_time: 120,
            streak: Some(7),
        };
        let ended = lib
            .engine
            .end_session(started.session.id, lib.owner, counters, noon() + Duration::minutes(2))
            .await
            .unwrap();

        assert_eq!(ended.session.status, SessionStatus::Ended);
        assert!(ended.session.max_streak >= 7);
        assert_eq!(ended.current_streak, 1);

        let listed = lib.engine.list_sessions(lib.owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, SessionStatus::Ended);
        assert_eq!(listed[0].cards_studied, 20);
        assert_eq!(listed[0].ended_at, Some(noon() + Duration::minutes(2)));
    }

    #[tokio::test]
    async fn test_end_session_twice_conflicts() {
        let lib = library().await;
        let started = lib
            .engine
            .create_session(lib.owner, lib.deck, StudyMode::Normal, noon())
            .await
            .unwrap();
        let first = FinalCounters {
            cards_studied: 3,
            correct_answers: 2,
            total_time: 30,
            streak: None,
        };
        lib.engine
            .end_session(started.session.id, lib.owner, first, noon())
            .await
            .unwrap();

        let second = FinalCounters {
            cards_studied: 50,
            correct_answers: 50,
            total_time: 999,
            streak: Some(50),
        };
        let again = lib
            .engine
            .end_session(started.session.id, lib.owner, second, noon())
            .await;
        assert!(matches!(again, Err(StudyError::Conflict(_))));

        let stored = lib
            .engine
            .get_session(started.session.id, lib.owner)
            .await
            .unwrap();
        assert_eq!(stored.cards_studied, 3);
        assert_eq!(stored.correct_answers, 2);
        assert_eq!(stored.total_time, 30);
        assert_eq!(stored.max_streak, 0);
    }

    #[tokio::test]
    async fn test_end_session_keeps_larger_counters() {
        let lib = library().await;
        let started = lib
            .engine
            .create_session(lib.owner, lib.deck, StudyMode::Normal, noon())
            .await
            .unwrap();
        for card in &lib.cards {
            lib.engine
                .review_card(started.session.id, lib.owner, *card, true, 10, noon())
                .await
                .unwrap();
        }

        let ended = lib
            .engine
            .end_session(
                started.session.id,
                lib.owner,
                FinalCounters {
                    cards_studied: 1,
                    correct_answers: 1,
                    total_time: 45,
                    streak: None,
                },
                noon(),
            )
            .await
            .unwrap();

        assert_eq!(ended.session.cards_studied, 3);
        assert_eq!(ended.session.correct_answers, 3);
        assert_eq!(ended.session.total_time, 45);
        assert_eq!(ended.session.streak, 3);
        assert_eq!(ended.session.max_streak, 3);
    }

    #[tokio::test]
    async fn test_end_session_ownership_and_validation() {
        let lib = library().await;
        let started = lib
            .engine
            .create_session(lib.owner, lib.deck, StudyMode::Normal, noon())
            .await
            .unwrap();

        let foreign = lib
            .engine
            .end_session(started.session.id, lib.stranger, FinalCounters::default(), noon())
            .await;
        assert!(matches!(
            foreign,
            Err(StudyError::Forbidden(Resource::Session))
        ));

        let invalid = FinalCounters {
            cards_studied: 2,
            correct_answers: 5,
            total_time: 0,
            streak: None,
        };
        let result = lib
            .engine
            .end_session(started.session.id, lib.owner, invalid, noon())
            .await;
        assert!(matches!(result, Err(StudyError::Validation(_))));

        let missing = lib
            .engine
            .end_session(Uuid::new_v4(), lib.owner, FinalCounters::default(), noon())
            .await;
        assert!(matches!(
            missing,
            Err(StudyError::NotFound(Resource::Session))
        ));

        let still_active = lib
            .engine
            .get_session(started.session.id, lib.owner)
            .await
            .unwrap();
        assert!(still_active.is_active());
    }

    #[tokio::test]
    async fn test_list_sessions_newest_first() {
        let lib = library().await;
        let older = lib
            .engine
            .create_session(lib.owner, lib.deck, StudyMode::Normal, noon() - Duration::hours(3))
            .await
            .unwrap();
        let newer = lib
            .engine
            .create_session(lib.owner, lib.deck, StudyMode::Speed, noon())
            .await
            .unwrap();
        lib.engine
            .create_session(lib.stranger, lib.deck, StudyMode::Normal, noon())
            .await
            .unwrap();

        let ids: Vec<Uuid> = lib
            .engine
            .list_sessions(lib.owner)
            .await
            .unwrap()
            .into_iter()
            .map(|session| session.id)
            .collect();
        assert_eq!(ids, vec![newer.session.id, older.session.id]);

        let other = lib.engine.get_session(older.session.id, lib.stranger).await;
        assert!(matches!(
            other,
            Err(StudyError::Forbidden(Resource::Session))
        ));
    }

    #[test]
    fn test_session_started_serialization() {
        let session = StudySession::start(
            Uuid::nil(),
            Uuid::nil(),
            Uuid::nil(),
            StudyMode::Speed,
            noon(),
        );
        let started = SessionStarted {
            session,
            due_card_ids: vec![Uuid::nil()],
        };
        let json = serde_json::to_value(&started).unwrap();

        assert_eq!(json["mode"], "speed");
        assert_eq!(json["status"], "active");
        assert_eq!(json["cardsStudied"], 0);
        assert!(json["endedAt"].is_null());
        assert_eq!(json["dueCardIds"].as_array().map(Vec::len), Some(1));
    }

    /// Store whose reads outside a transaction always fail
    #[derive(Clone)]
    struct ReadsUnavailable(MemoryStudyStore);

    fn unavailable() -> StoreError {
        StoreError::Database(sqlx::Error::PoolTimedOut)
    }

    impl StudyStore for ReadsUnavailable {
        type Tx = MemoryStudyTx;

        async fn begin(&self) -> Result<MemoryStudyTx, StoreError> {
            self.0.begin().await
        }

        async fn deck_access(&self, _: Uuid, _: Uuid) -> Result<DeckAccess, StoreError> {
            Err(unavailable())
        }

        async fn due_cards(
            &self,
            _: Uuid,
            _: Option<Uuid>,
            _: DateTime<Utc>,
        ) -> Result<Vec<DueCard>, StoreError> {
            Err(unavailable())
        }

        async fn find_session(&self, _: Uuid) -> Result<Option<StudySession>, StoreError> {
            Err(unavailable())
        }

        async fn list_sessions(
            &self,
            _: Uuid,
            _: Option<Uuid>,
        ) -> Result<Vec<StudySession>, StoreError> {
            Err(unavailable())
        }

        async fn list_speed_results(
            &self,
            _: Uuid,
            _: Option<Uuid>,
        ) -> Result<Vec<SpeedResult>, StoreError> {
            Err(unavailable())
        }

        async fn count_cards_at_level(
            &self,
            _: Uuid,
            _: Option<Uuid>,
            _: i32,
        ) -> Result<i64, StoreError> {
            Err(unavailable())
        }

        async fn count_deck_cards(&self, _: Uuid) -> Result<i64, StoreError> {
            Err(unavailable())
        }

        async fn library_counts(&self, _: Uuid) -> Result<LibraryCounts, StoreError> {
            Err(unavailable())
        }
    }

    #[tokio::test]
    async fn test_create_and_end_complete_inside_one_unit() {
        let lib = library().await;
        let memory = lib.engine.store().clone();
        let engine = StudyEngine::new(ReadsUnavailable(memory.clone()));

        let started = engine
            .create_session(lib.owner, lib.deck, StudyMode::Normal, noon())
            .await
            .unwrap();
        assert_eq!(started.due_card_ids, lib.cards);
        assert_eq!(memory.list_sessions(lib.owner, None).await.unwrap().len(), 1);

        let counters = FinalCounters {
            cards_studied: 2,
            correct_answers: 1,
            total_time: 30,
            streak: None,
        };
        let ended = engine
            .end_session(started.session.id, lib.owner, counters, noon())
            .await
            .unwrap();
        assert_eq!(ended.session.status, SessionStatus::Ended);
        assert_eq!(ended.current_streak, 1);

        let sessions = memory.list_sessions(lib.owner, None).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Ended);
    }
}
