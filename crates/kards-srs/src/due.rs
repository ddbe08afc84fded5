//! Due card selection and ordering.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// A card that may be offered for review.
///
/// Implemented by whatever row type the caller loads; cards the user never
/// reviewed report level 0 and no timestamps.
pub trait DueCandidate {
    fn mastery_level(&self) -> i32;
    fn last_reviewed(&self) -> Option<DateTime<Utc>>;
    fn next_review_date(&self) -> Option<DateTime<Utc>>;
    /// Stable position of the card inside its deck
    fn position(&self) -> i32;
}

/// A card is due when it has never been scheduled or its due date has passed.
pub fn is_due(next_review_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    next_review_date.is_none_or(|at| at <= now)
}

/// Review priority: lowest mastery first, then least recently reviewed (never
/// reviewed before anything else), then deck position.
pub fn due_order<C: DueCandidate>(a: &C, b: &C) -> Ordering {
    a.mastery_level()
        .cmp(&b.mastery_level())
        // `None < Some(_)`, so never-reviewed cards sort first
        .then_with(|| a.last_reviewed().cmp(&b.last_reviewed()))
        .then_with(|| a.position().cmp(&b.position()))
}

/// Filter the candidates down to the due ones and yield them in review order.
///
/// The sort is stable, so candidates that tie on every key keep the order in
/// which they were supplied. Nothing is cached; calling this again with the
/// same inputs yields the same sequence.
pub fn select_due<C, I>(candidates: I, now: DateTime<Utc>) -> impl Iterator<Item = C>
where
    C: DueCandidate,
    I: IntoIterator<Item = C>,
{
    let mut due: Vec<C> = candidates
        .into_iter()
        .filter(|card| is_due(card.next_review_date(), now))
        .collect();
    due.sort_by(due_order);
    due.into_iter()
}
