//! SRS (Spaced Repetition System) library for Kards
//!
//! This crate holds the pure parts of the study engine: the mastery ladder used
//! to schedule flashcard reviews, the ordering of due cards and the streak and
//! calendar math behind study analytics. Nothing in here touches storage or the
//! clock; callers pass `now`/`today` explicitly.

pub mod due;
pub mod schedule;
pub mod streak;

pub use due::{DueCandidate, due_order, is_due, select_due};
pub use schedule::{MAX_LEVEL, ProgressState, apply_review, interval_for_level, is_mastered};
pub use streak::{StreakSummary, WEEK_DAYS, summarize_streaks, trailing_week};
