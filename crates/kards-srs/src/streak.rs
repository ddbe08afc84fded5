//! Account-level streaks and the trailing activity window.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};

/// Number of days in the weekly activity window.
pub const WEEK_DAYS: usize = 7;

/// Consecutive study days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreakSummary {
    /// Run of study days ending today, or ending yesterday when the learner
    /// has not studied yet today
    pub current: u32,
    /// Longest run of consecutive study days ever
    pub longest: u32,
}

/// Compute streaks from the calendar days on which the learner studied.
///
/// Days may be supplied in any order and may repeat. Days after `today` are
/// ignored.
pub fn summarize_streaks<I>(days: I, today: NaiveDate) -> StreakSummary
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: BTreeSet<NaiveDate> = days.into_iter().filter(|day| *day <= today).collect();

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for &day in &days {
        run = match previous.and_then(|p| p.succ_opt()) {
            Some(expected) if expected == day => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }

    let anchor = if days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt().filter(|yesterday| days.contains(yesterday))
    };

    let mut current = 0;
    let mut cursor = anchor;
    while let Some(day) = cursor.filter(|day| days.contains(day)) {
        current += 1;
        cursor = day.pred_opt();
    }

    StreakSummary { current, longest }
}

/// The seven calendar days ending `today`, oldest first.
pub fn trailing_week(today: NaiveDate) -> [NaiveDate; WEEK_DAYS] {
    std::array::from_fn(|i| today - Days::new((WEEK_DAYS - 1 - i) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_no_activity() {
        assert_eq!(
            summarize_streaks(Vec::new(), day(10)),
            StreakSummary::default()
        );
    }

    #[test]
    fn test_streak_ending_today() {
        let summary = summarize_streaks([day(8), day(9), day(10)], day(10));
        assert_eq!(summary, StreakSummary { current: 3, longest: 3 });
    }

    #[test]
    fn test_streak_alive_until_end_of_today() {
        let summary = summarize_streaks([day(7), day(8), day(9)], day(10));
        assert_eq!(summary.current, 3);
    }

    #[test]
    fn test_streak_broken_by_missed_day() {
        let summary = summarize_streaks([day(5), day(6), day(7), day(8)], day(10));
        assert_eq!(summary, StreakSummary { current: 0, longest: 4 });
    }

    #[test]
    fn test_duplicates_and_unordered_days() {
        let summary = summarize_streaks(
            [day(10), day(2), day(9), day(10), day(1), day(3), day(2)],
            day(10),
        );
        assert_eq!(summary, StreakSummary { current: 2, longest: 3 });
    }

    #[test]
    fn test_future_days_ignored() {
        let summary = summarize_streaks([day(10), day(11), day(12)], day(10));
        assert_eq!(summary, StreakSummary { current: 1, longest: 1 });
    }

    #[test]
    fn test_streak_across_month_boundary() {
        let days = [
            NaiveDate::from_ymd_opt(2024, 4, 29).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            day(1),
        ];
        assert_eq!(summarize_streaks(days, day(1)).current, 3);
    }

    #[test]
    fn test_trailing_week() {
        let week = trailing_week(day(10));
        assert_eq!(week.len(), WEEK_DAYS);
        assert_eq!(week[0], day(4));
        assert_eq!(week[6], day(10));
        assert!(week.windows(2).all(|w| w[0].succ_opt() == Some(w[1])));
    }
}
