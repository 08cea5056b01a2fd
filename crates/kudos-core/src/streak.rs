//! Streak derivation from calendar check-in dates.
//!
//! The live streak used during check-in comes from the stored previous
//! day's `streak_count`, not from recomputation. This walk exists for
//! recomputation and audit: given the most recent check-in dates in
//! descending order, it rebuilds the length of the contiguous run
//! ending today (or yesterday, when today's check-in has not happened
//! yet). A gap of more than one calendar day breaks the run.

use chrono::{Days, NaiveDate};

/// Maximum number of check-in dates examined when recomputing a streak.
pub const STREAK_SCAN_LIMIT: i64 = 30;

/// Derive the current streak from check-in dates in descending order.
///
/// Walks backward one calendar day at a time starting from `today`.
/// The run may be anchored at yesterday instead, covering the case
/// where the user has checked in every day up to yesterday but not yet
/// today. Duplicate dates cannot occur (one check-in row per day), and
/// dates after `today` terminate the walk.
pub fn streak_from_dates(today: NaiveDate, dates_desc: &[NaiveDate]) -> u32 {
    let mut streak: u32 = 0;
    let mut anchor = today;

    for &date in dates_desc {
        let Some(expected) = anchor.checked_sub_days(Days::new(u64::from(streak))) else {
            break;
        };

        if date == expected {
            streak = streak.saturating_add(1);
        } else if expected.pred_opt() == Some(date) {
            // One day behind the expected date: re-anchor the walk there
            // and keep counting. This covers the not-yet-checked-in-today
            // case where the newest date is yesterday.
            streak = streak.saturating_add(1);
            anchor = date;
        } else {
            break;
        }
    }

    streak
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn empty_history_is_zero() {
        assert_eq!(streak_from_dates(day("2026-08-06"), &[]), 0);
    }

    #[test]
    fn single_checkin_today() {
        let today = day("2026-08-06");
        assert_eq!(streak_from_dates(today, &[today]), 1);
    }

    #[test]
    fn consecutive_days_count_up() {
        let today = day("2026-08-06");
        let dates = [day("2026-08-06"), day("2026-08-05"), day("2026-08-04")];
        assert_eq!(streak_from_dates(today, &dates), 3);
    }

    #[test]
    fn run_anchored_at_yesterday() {
        // Checked in every day up to yesterday, not yet today.
        let today = day("2026-08-06");
        let dates = [day("2026-08-05"), day("2026-08-04"), day("2026-08-03")];
        assert_eq!(streak_from_dates(today, &dates), 3);
    }

    #[test]
    fn old_history_does_not_count() {
        let today = day("2026-08-06");
        let dates = [day("2026-08-01"), day("2026-07-31")];
        assert_eq!(streak_from_dates(today, &dates), 0);
    }

    #[test]
    fn run_stops_at_break() {
        let today = day("2026-08-06");
        // 6th, 5th, then a jump back to the 1st: only the first two count.
        let dates = [day("2026-08-06"), day("2026-08-05"), day("2026-08-01")];
        assert_eq!(streak_from_dates(today, &dates), 2);
    }

    #[test]
    fn month_boundary_is_contiguous() {
        let today = day("2026-08-02");
        let dates = [day("2026-08-02"), day("2026-08-01"), day("2026-07-31")];
        assert_eq!(streak_from_dates(today, &dates), 3);
    }
}
