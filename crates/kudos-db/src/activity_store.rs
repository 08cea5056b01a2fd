//! Message activity rewards and retention.
//!
//! Two independent reward rules share the `daily_activity_rewards`
//! aggregate row:
//!
//! - the **activity-window bonus**: one bonus per calendar day, granted
//!   when a member's message count within the trailing six-hour window
//!   qualifies;
//! - the **first-messages reward**: the first three qualifying messages
//!   each calendar day earn points, enforced by re-reading today's
//!   counted-message total before granting.
//!
//! Both rules may fire for the same message. Every grant commits the
//! reward row and the balance update in one transaction.
//!
//! Raw message timestamps live in the append-only `message_logs` table,
//! pruned by [`ActivityStore::cleanup_old_message_logs`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;

use kudos_core::{message_reward, ACTIVITY_WINDOW_HOURS};
use kudos_types::{ActivityReward, ActivityStats, DailyMessageStats, ServerId, UserId};

use crate::error::{is_unique_violation, DbError};
use crate::executor::with_retries;

/// Operations on the `message_logs` and `daily_activity_rewards`
/// tables.
pub struct ActivityStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityStore<'a> {
    /// Create a new activity store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a message timestamp to the activity log.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn record_message(
        &self,
        user: UserId,
        server: ServerId,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let pool = self.pool;
        with_retries("record_message", || async move {
            sqlx::query(
                r"INSERT INTO message_logs (user_id, server_id, message_time)
                  VALUES ($1, $2, $3)",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(at)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await
    }

    /// Count messages recorded for a member within a time window
    /// (inclusive bounds).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count_messages_in_window(
        &self,
        user: UserId,
        server: ServerId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let pool = self.pool;
        with_retries("count_messages_in_window", || async move {
            sqlx::query_scalar::<_, i64>(
                r"SELECT COUNT(*) FROM message_logs
                  WHERE user_id = $1 AND server_id = $2
                    AND message_time BETWEEN $3 AND $4",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(window_start)
            .bind(window_end)
            .fetch_one(pool)
            .await
        })
        .await
    }

    /// Whether the member has already received the activity-window
    /// bonus for the given day.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn has_daily_activity_reward(
        &self,
        user: UserId,
        server: ServerId,
        date: NaiveDate,
    ) -> Result<bool, DbError> {
        let pool = self.pool;
        let row = with_retries("has_daily_activity_reward", || async move {
            sqlx::query_scalar::<_, i32>(
                r"SELECT 1 FROM daily_activity_rewards
                  WHERE user_id = $1 AND server_id = $2 AND reward_date = $3",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(date)
            .fetch_optional(pool)
            .await
        })
        .await?;

        Ok(row.is_some())
    }

    /// Grant the once-per-day activity-window bonus.
    ///
    /// Inserts the reward row and credits the balance in one
    /// transaction. Returns `false` without any effect when the bonus
    /// was already granted for the day -- the expected outcome when
    /// concurrent qualifying messages race.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on storage failure.
    pub async fn give_daily_activity_reward(
        &self,
        user: UserId,
        server: ServerId,
        points: i64,
        message_count: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let reward_date = at.date_naive();
        let pool = self.pool;

        let granted = with_retries("give_daily_activity_reward", || async move {
            let mut tx = pool.begin().await?;

            let inserted = sqlx::query(
                r"INSERT INTO daily_activity_rewards
                      (user_id, server_id, reward_date, points_earned,
                       message_count_when_rewarded, reward_time)
                  VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(reward_date)
            .bind(points)
            .bind(message_count)
            .bind(at)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(err) if is_unique_violation(&err) => {
                    tx.rollback().await?;
                    return Ok(false);
                }
                Err(err) => return Err(err),
            }

            sqlx::query(
                r"INSERT INTO user_points (user_id, server_id, points, total_checkins)
                  VALUES ($1, $2, GREATEST(0, $3), 0)
                  ON CONFLICT (user_id, server_id)
                  DO UPDATE SET
                      points = GREATEST(0, user_points.points + $3),
                      updated_at = NOW()",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(points)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(true)
        })
        .await?;

        if granted {
            tracing::debug!(%user, %server, points, message_count, "activity-window bonus granted");
        }
        Ok(granted)
    }

    /// Today's message aggregate for the first-messages reward path,
    /// zero when absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn daily_message_stats(
        &self,
        user: UserId,
        server: ServerId,
        date: NaiveDate,
    ) -> Result<DailyMessageStats, DbError> {
        let pool = self.pool;
        let row = with_retries("daily_message_stats", || async move {
            sqlx::query_as::<_, (i64, i64)>(
                r"SELECT message_count_when_rewarded, points_earned
                  FROM daily_activity_rewards
                  WHERE user_id = $1 AND server_id = $2 AND reward_date = $3",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(date)
            .fetch_optional(pool)
            .await
        })
        .await?;

        Ok(row.map_or_else(DailyMessageStats::default, |(message_count, points_earned)| {
            DailyMessageStats {
                message_count,
                points_earned,
            }
        }))
    }

    /// Points the next qualifying message should earn, given today's
    /// counted-message total.
    ///
    /// Re-reads the aggregate so each of the first three messages per
    /// calendar day earns points and later messages earn nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the read fails.
    pub async fn should_give_daily_message_points(
        &self,
        user: UserId,
        server: ServerId,
        at: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let stats = self
            .daily_message_stats(user, server, at.date_naive())
            .await?;
        Ok(message_reward(stats.message_count))
    }

    /// Record one counted message and credit its reward.
    ///
    /// Increments today's aggregate row (creating it when absent) and,
    /// when `points_earned` is positive, credits the balance in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on storage failure.
    pub async fn record_daily_message_reward(
        &self,
        user: UserId,
        server: ServerId,
        points_earned: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let reward_date = at.date_naive();
        let pool = self.pool;

        with_retries("record_daily_message_reward", || async move {
            let mut tx = pool.begin().await?;

            sqlx::query(
                r"INSERT INTO daily_activity_rewards
                      (user_id, server_id, reward_date, message_count_when_rewarded,
                       points_earned, reward_time)
                  VALUES ($1, $2, $3, 1, $4, $5)
                  ON CONFLICT (user_id, server_id, reward_date)
                  DO UPDATE SET
                      message_count_when_rewarded =
                          daily_activity_rewards.message_count_when_rewarded + 1,
                      points_earned = daily_activity_rewards.points_earned + $4,
                      reward_time = $5",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(reward_date)
            .bind(points_earned)
            .bind(at)
            .execute(&mut *tx)
            .await?;

            if points_earned > 0 {
                sqlx::query(
                    r"INSERT INTO user_points (user_id, server_id, points, total_checkins)
                      VALUES ($1, $2, GREATEST(0, $3), 0)
                      ON CONFLICT (user_id, server_id)
                      DO UPDATE SET
                          points = GREATEST(0, user_points.points + $3),
                          updated_at = NOW()",
                )
                .bind(user.into_inner())
                .bind(server.into_inner())
                .bind(points_earned)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Snapshot of the member's recent activity: trailing-window
    /// message count, whether today's bonus has been granted, and
    /// today's reward row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any read fails.
    pub async fn user_activity_stats(
        &self,
        user: UserId,
        server: ServerId,
    ) -> Result<ActivityStats, DbError> {
        let now = Utc::now();
        let window_start = Duration::try_hours(ACTIVITY_WINDOW_HOURS)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(now);
        let today = now.date_naive();

        let messages_in_window = self
            .count_messages_in_window(user, server, window_start, now)
            .await?;
        let has_daily_reward = self.has_daily_activity_reward(user, server, today).await?;

        let pool = self.pool;
        let reward_row = with_retries("activity_reward_row", || async move {
            sqlx::query_as::<_, (i64, i64, DateTime<Utc>)>(
                r"SELECT points_earned, message_count_when_rewarded, reward_time
                  FROM daily_activity_rewards
                  WHERE user_id = $1 AND server_id = $2 AND reward_date = $3",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(today)
            .fetch_optional(pool)
            .await
        })
        .await?;

        Ok(ActivityStats {
            messages_in_window,
            has_daily_reward,
            reward: reward_row.map(|(points_earned, message_count_when_rewarded, reward_time)| {
                ActivityReward {
                    points_earned,
                    message_count_when_rewarded,
                    reward_time,
                }
            }),
        })
    }

    /// Delete message log rows older than the retention horizon.
    ///
    /// Advisory maintenance operation, off the reward-granting critical
    /// path. Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] when the horizon is out of calendar
    /// range, or [`DbError::Postgres`] if the delete fails.
    pub async fn cleanup_old_message_logs(&self, days_to_keep: i64) -> Result<u64, DbError> {
        let cutoff = Duration::try_days(days_to_keep)
            .and_then(|horizon| Utc::now().checked_sub_signed(horizon))
            .ok_or_else(|| {
                DbError::Config(format!("retention horizon out of range: {days_to_keep} days"))
            })?;

        let pool = self.pool;
        let deleted = with_retries("cleanup_old_message_logs", || async move {
            let result = sqlx::query(r"DELETE FROM message_logs WHERE message_time < $1")
                .bind(cutoff)
                .execute(pool)
                .await?;
            Ok(result.rows_affected())
        })
        .await?;

        tracing::info!(days_to_keep, deleted, "pruned old message logs");
        Ok(deleted)
    }
}
