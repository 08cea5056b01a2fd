//! Reward schedules for check-ins and message activity.
//!
//! The schedules are expressed as pure functions of recorded state so
//! the storage layer can apply them inside its transactions and tests
//! can exercise them without a database.

/// Base points for a daily check-in.
pub const BASE_CHECKIN_POINTS: i64 = 5;

/// Extra points when the resulting streak is a multiple of seven.
pub const WEEKLY_BONUS_POINTS: i64 = 5;

/// Cap applied to a single check-in grant.
pub const MAX_CHECKIN_POINTS: i64 = 100;

/// Number of messages per calendar day that earn points.
pub const DAILY_REWARDED_MESSAGES: i64 = 3;

/// Points granted for each rewarded message.
pub const MESSAGE_REWARD_POINTS: i64 = 5;

/// Width of the trailing message-activity window, in hours.
pub const ACTIVITY_WINDOW_HOURS: i64 = 6;

/// One-time bonus for a first Twitter binding, credited to the
/// member's global account.
pub const FIRST_BIND_BONUS_POINTS: i64 = 20;

/// Points earned by a check-in that results in the given streak.
///
/// Base reward plus the weekly bonus on every seventh consecutive day,
/// capped at [`MAX_CHECKIN_POINTS`].
pub const fn checkin_reward(streak: i64) -> i64 {
    let weekly = match streak.checked_rem(7) {
        Some(0) => WEEKLY_BONUS_POINTS,
        _ => 0,
    };
    let total = BASE_CHECKIN_POINTS.saturating_add(weekly);
    if total > MAX_CHECKIN_POINTS {
        MAX_CHECKIN_POINTS
    } else {
        total
    }
}

/// Points earned by the next qualifying message, given how many
/// messages have already been counted toward today's reward.
///
/// The first [`DAILY_REWARDED_MESSAGES`] messages each day earn
/// [`MESSAGE_REWARD_POINTS`]; later messages earn nothing.
pub const fn message_reward(messages_already_counted: i64) -> i64 {
    if messages_already_counted < DAILY_REWARDED_MESSAGES {
        MESSAGE_REWARD_POINTS
    } else {
        0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plain_day_earns_base() {
        assert_eq!(checkin_reward(1), 5);
        assert_eq!(checkin_reward(3), 5);
        assert_eq!(checkin_reward(8), 5);
    }

    #[test]
    fn every_seventh_day_earns_bonus() {
        assert_eq!(checkin_reward(7), 10);
        assert_eq!(checkin_reward(14), 10);
        assert_eq!(checkin_reward(70), 10);
    }

    #[test]
    fn reward_is_capped() {
        // The schedule never exceeds the cap, whatever the streak.
        for streak in 1..1_000 {
            assert!(checkin_reward(streak) <= MAX_CHECKIN_POINTS);
        }
    }

    #[test]
    fn first_three_messages_earn_points() {
        assert_eq!(message_reward(0), 5);
        assert_eq!(message_reward(1), 5);
        assert_eq!(message_reward(2), 5);
        assert_eq!(message_reward(3), 0);
        assert_eq!(message_reward(100), 0);
    }
}
