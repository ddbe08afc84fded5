//! Mastery ladder scheduling.

use chrono::{DateTime, Duration, Utc};

/// Highest rung on the mastery ladder. Cards at this level count as mastered.
pub const MAX_LEVEL: i32 = 5;

/// Review state of one card for one user.
///
/// A card that was never reviewed is represented by `ProgressState::default()`:
/// level 0, no review timestamps, and therefore immediately due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressState {
    /// Total reviews ever recorded
    pub review_count: i32,
    /// Total correct reviews, never above `review_count`
    pub correct_count: i32,
    /// Rung on the ladder, `0..=MAX_LEVEL`
    pub mastery_level: i32,
    /// When the card was last reviewed
    pub last_reviewed: Option<DateTime<Utc>>,
    /// When the card becomes due again
    pub next_review_date: Option<DateTime<Utc>>,
}

/// Get the review interval for a mastery level.
///
/// # Arguments
///
/// * `level` - The mastery level, values outside `0..=MAX_LEVEL` are clamped
///
/// # Algorithm
///
/// * Level 0: 2 hours (same-day retry)
/// * Level 1: 1 day
/// * Level 2: 3 days
/// * Level 3: 7 days
/// * Level 4: 14 days
/// * Level 5: 30 days (mastered, capped)
pub fn interval_for_level(level: i32) -> Duration {
    match level {
        l if l <= 0 => Duration::hours(2),
        1 => Duration::days(1),
        2 => Duration::days(3),
        3 => Duration::days(7),
        4 => Duration::days(14),
        _ => Duration::days(30),
    }
}

/// Whether a mastery level sits on the top rung of the ladder.
pub const fn is_mastered(level: i32) -> bool {
    level >= MAX_LEVEL
}

/// Apply one review outcome to a card's progress.
///
/// A correct answer promotes the card one rung and pushes the next review out
/// to the interval of the new rung. The due date never moves earlier on a
/// correct answer, even when `now` lags behind a review recorded from another
/// device. An incorrect answer demotes the card one rung (it does not reset it)
/// and brings it back after the level 0 interval.
///
/// # Arguments
///
/// * `progress` - The state before the review
/// * `correct` - Whether the learner answered correctly
/// * `now` - The review time
///
/// # Returns
///
/// The state after the review. The input is not modified.
pub fn apply_review(progress: &ProgressState, correct: bool, now: DateTime<Utc>) -> ProgressState {
    let level = progress.mastery_level.clamp(0, MAX_LEVEL);

    let (mastery_level, next_review_date, correct_count) = if correct {
        let promoted = (level + 1).min(MAX_LEVEL);
        let scheduled = now + interval_for_level(promoted);
        let next = match progress.next_review_date {
            Some(previous) if previous > scheduled => previous,
            _ => scheduled,
        };
        (promoted, next, progress.correct_count + 1)
    } else {
        let demoted = (level - 1).max(0);
        (demoted, now + interval_for_level(0), progress.correct_count)
    };

    ProgressState {
        review_count: progress.review_count + 1,
        correct_count: correct_count.min(progress.review_count + 1),
        mastery_level,
        last_reviewed: Some(now),
        next_review_date: Some(next_review_date),
    }
}
