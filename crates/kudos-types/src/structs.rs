//! Result types returned across the upward interface.
//!
//! Bot-command and HTTP collaborators consume these as plain structured
//! data. None of them carry storage handles or connection state; a
//! failed operation is expressed either as an error (validation,
//! connectivity) or as a negative outcome value (integrity races,
//! best-effort paths), per the error-handling design.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Aggregate point state for one member within one tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsSummary {
    /// Current point balance (never negative).
    pub points: i64,
    /// Lifetime number of daily check-ins.
    pub total_checkins: i64,
}

/// Result of a daily check-in attempt.
///
/// Under concurrent check-ins for the same (user, server, day), exactly
/// one caller receives `success: true`; every other caller receives the
/// winner's `points_earned` and `streak`, never its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinOutcome {
    /// Whether this call created today's check-in record.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
    /// Points granted by today's check-in.
    pub points_earned: i64,
    /// Streak recorded by today's check-in.
    pub streak: i64,
    /// New total balance; only present for the winning call.
    pub total_points: Option<i64>,
}

impl CheckinOutcome {
    /// Outcome for the call that created today's check-in record.
    pub fn won(points_earned: i64, streak: i64, total_points: i64) -> Self {
        Self {
            success: true,
            message: "Checked in!".to_owned(),
            points_earned,
            streak,
            total_points: Some(total_points),
        }
    }

    /// Outcome reported when today's record already exists.
    pub fn already_checked_in(points_earned: i64, streak: i64) -> Self {
        Self {
            success: false,
            message: "Already checked in today!".to_owned(),
            points_earned,
            streak,
            total_points: None,
        }
    }
}

/// One row of a tenant's points leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position, assigned by descending points.
    pub rank: u32,
    /// The ranked member.
    pub user_id: UserId,
    /// Current point balance.
    pub points: i64,
    /// Lifetime number of daily check-ins.
    pub total_checkins: i64,
}

/// Result of binding a Twitter account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindOutcome {
    /// Whether the binding was persisted.
    pub success: bool,
    /// Whether this was the user's first binding in this scope.
    pub is_first_time: bool,
    /// One-time bonus credited to the global account (0 on rebinds).
    pub bonus_points: i64,
}

impl BindOutcome {
    /// A first-time binding that granted the one-time bonus.
    pub const fn first_bind(bonus_points: i64) -> Self {
        Self {
            success: true,
            is_first_time: true,
            bonus_points,
        }
    }

    /// A repeat binding that refreshed credentials without a bonus.
    pub const fn rebind() -> Self {
        Self {
            success: true,
            is_first_time: false,
            bonus_points: 0,
        }
    }

    /// A binding attempt that failed and changed nothing.
    pub const fn failed() -> Self {
        Self {
            success: false,
            is_first_time: false,
            bonus_points: 0,
        }
    }
}

/// The daily activity reward granted so far today, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityReward {
    /// Points credited by today's activity rewards.
    pub points_earned: i64,
    /// Message count recorded when the reward row was last updated.
    pub message_count_when_rewarded: i64,
    /// When the reward row was last updated.
    pub reward_time: DateTime<Utc>,
}

/// Snapshot of a member's recent message activity within one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStats {
    /// Messages recorded in the trailing activity window.
    pub messages_in_window: i64,
    /// Whether today's six-hour-window bonus has been granted.
    pub has_daily_reward: bool,
    /// Today's reward row, when one exists.
    pub reward: Option<ActivityReward>,
}

/// Per-day message aggregate used by the first-N-messages reward path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMessageStats {
    /// Messages counted toward today's reward so far.
    pub message_count: i64,
    /// Points credited by today's message rewards so far.
    pub points_earned: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn winning_checkin_carries_total() {
        let outcome = CheckinOutcome::won(10, 7, 120);
        assert!(outcome.success);
        assert_eq!(outcome.points_earned, 10);
        assert_eq!(outcome.streak, 7);
        assert_eq!(outcome.total_points, Some(120));
    }

    #[test]
    fn losing_checkin_has_no_total() {
        let outcome = CheckinOutcome::already_checked_in(5, 3);
        assert!(!outcome.success);
        assert_eq!(outcome.total_points, None);
        assert_eq!(outcome.message, "Already checked in today!");
    }

    #[test]
    fn bind_outcome_constructors() {
        assert!(BindOutcome::first_bind(20).is_first_time);
        assert_eq!(BindOutcome::first_bind(20).bonus_points, 20);
        assert_eq!(BindOutcome::rebind().bonus_points, 0);
        assert!(!BindOutcome::failed().success);
    }

    #[test]
    fn outcome_serde_roundtrip() {
        let outcome = CheckinOutcome::won(5, 1, 5);
        let json = serde_json::to_string(&outcome).unwrap();
        let restored: CheckinOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, outcome);
    }
}
