//! Pure domain arithmetic for the Kudos points ledger.
//!
//! Everything in this crate is deterministic and free of I/O: streak
//! derivation from calendar dates, the check-in and message reward
//! schedules, and point-delta validation. The storage layer applies
//! these rules inside its transactions; keeping them here makes the
//! arithmetic unit-testable without a database.
//!
//! # Design Principles
//!
//! - All arithmetic is checked or saturating (no silent overflow).
//! - Reward values are functions of recorded state, never of wall-clock
//!   side effects; callers pass dates and counts in explicitly.
//!
//! # Modules
//!
//! - [`streak`] -- streak derivation from descending check-in dates
//! - [`rewards`] -- check-in and message-activity reward schedules
//! - [`points`] -- point-delta validation bounds

pub mod points;
pub mod rewards;
pub mod streak;

// Re-export primary items for convenience.
pub use points::{validate_delta, DomainError, MAX_POINT_DELTA};
pub use rewards::{
    checkin_reward, message_reward, ACTIVITY_WINDOW_HOURS, BASE_CHECKIN_POINTS,
    DAILY_REWARDED_MESSAGES, FIRST_BIND_BONUS_POINTS, MAX_CHECKIN_POINTS, MESSAGE_REWARD_POINTS,
    WEEKLY_BONUS_POINTS,
};
pub use streak::{streak_from_dates, STREAK_SCAN_LIMIT};
