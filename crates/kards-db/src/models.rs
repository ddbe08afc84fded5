use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a study session is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "study_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    /// One card at a time, flip and grade
    Normal,
    /// Timed run, results submitted as one batch
    Speed,
    /// Replay against a previous run
    Ghost,
}

/// Lifecycle of a study session. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Ended,
}

/// Per (user, card) review state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CardProgress {
    /// Owning user
    pub user_id: Uuid,
    /// Reviewed card
    pub card_id: Uuid,
    /// Total reviews ever recorded
    pub review_count: i32,
    /// Total correct reviews (never above `review_count`)
    pub correct_count: i32,
    /// Rung on the mastery ladder
    pub mastery_level: i32,
    /// Most recent review (null until the first review)
    pub last_reviewed: Option<DateTime<Utc>>,
    /// When the card becomes due again (null means due now)
    pub next_review_date: Option<DateTime<Utc>>,
}

impl CardProgress {
    /// Progress of a card the user never reviewed
    pub const fn new(user_id: Uuid, card_id: Uuid) -> Self {
        Self {
            user_id,
            card_id,
            review_count: 0,
            correct_count: 0,
            mastery_level: 0,
            last_reviewed: None,
            next_review_date: None,
        }
    }
}

/// One learner's pass over a deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    /// Unique session identifier
    pub id: Uuid,
    /// Owner of the session
    pub user_id: Uuid,
    /// Studied deck
    pub deck_id: Uuid,
    pub mode: StudyMode,
    pub status: SessionStatus,
    pub cards_studied: i32,
    pub correct_answers: i32,
    /// Accumulated study time in seconds
    pub total_time: i32,
    /// Current run of correct answers inside the session
    pub streak: i32,
    pub max_streak: i32,
    pub started_at: DateTime<Utc>,
    /// Null while the session is active
    pub ended_at: Option<DateTime<Utc>>,
}

impl StudySession {
    /// A fresh active session with zeroed counters
    pub const fn start(
        id: Uuid,
        user_id: Uuid,
        deck_id: Uuid,
        mode: StudyMode,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            deck_id,
            mode,
            status: SessionStatus::Active,
            cards_studied: 0,
            correct_answers: 0,
            total_time: 0,
            streak: 0,
            max_streak: 0,
            started_at,
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// Standalone summary of a speed mode run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SpeedResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub deck_id: Uuid,
    pub cards_played: i32,
    pub correct_answers: i32,
    /// Run duration in seconds
    pub total_time: i32,
    pub max_streak: i32,
    /// Number of itemized card outcomes applied with the summary
    pub item_count: i32,
    /// Idempotency key, unique per user
    pub dedup_key: String,
    /// SHA-256 of the canonical submission, hex encoded
    pub fingerprint: String,
    pub submitted_at: DateTime<Utc>,
}

/// One review outcome, attributed to exactly one session or speed result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub session_id: Option<Uuid>,
    pub speed_result_id: Option<Uuid>,
    pub correct: bool,
    /// Seconds spent on the card
    pub time_spent: i32,
    pub reviewed_at: DateTime<Utc>,
}

/// A card joined with the user's progress on it, used for due selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DueCard {
    pub card_id: Uuid,
    pub deck_id: Uuid,
    pub front: String,
    pub back: String,
    /// Position of the card inside its deck
    pub position: i32,
    /// 0 when the user never reviewed the card
    pub mastery_level: i32,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review_date: Option<DateTime<Utc>>,
}

/// Ownership and visibility of a deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct DeckOwnership {
    pub owner_id: Uuid,
    pub is_public: bool,
}

/// Result of the deck authorization check shared by every study operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckAccess {
    /// The user owns the deck
    Owner,
    /// Someone else owns the deck but it is public
    Public,
    /// The deck exists but the user may not study it
    Denied,
    /// No such deck
    Missing,
}

impl DeckAccess {
    /// Resolve access for `user_id` from the deck's ownership row
    pub fn resolve(ownership: Option<DeckOwnership>, user_id: Uuid) -> Self {
        match ownership {
            None => Self::Missing,
            Some(deck) if deck.owner_id == user_id => Self::Owner,
            Some(deck) if deck.is_public => Self::Public,
            Some(_) => Self::Denied,
        }
    }
}

/// Size of the user's own library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::FromRow)]
pub struct LibraryCounts {
    pub total_decks: i64,
    pub total_cards: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_access_resolve() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let private = DeckOwnership {
            owner_id: owner,
            is_public: false,
        };
        let public = DeckOwnership {
            owner_id: owner,
            is_public: true,
        };

        assert_eq!(DeckAccess::resolve(None, owner), DeckAccess::Missing);
        assert_eq!(DeckAccess::resolve(Some(private), owner), DeckAccess::Owner);
        assert_eq!(DeckAccess::resolve(Some(public), owner), DeckAccess::Owner);
        assert_eq!(DeckAccess::resolve(Some(public), other), DeckAccess::Public);
        assert_eq!(DeckAccess::resolve(Some(private), other), DeckAccess::Denied);
    }

    #[test]
    fn test_study_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&StudyMode::Speed).unwrap(),
            "\"speed\""
        );
        let mode: StudyMode = serde_json::from_str("\"ghost\"").unwrap();
        assert_eq!(mode, StudyMode::Ghost);
        assert!(serde_json::from_str::<StudyMode>("\"turbo\"").is_err());
    }
}
