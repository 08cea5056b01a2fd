//! Point balances, daily check-ins, and the leaderboard.
//!
//! The check-in path is where concurrent reward issuance is decided.
//! The day-uniqueness constraint on `daily_checkins` serializes all
//! callers for the same (user, server, day): exactly one insert
//! succeeds, and every losing caller re-reads the winner's row and
//! reports the winner's reward and streak, never its own. The check-in
//! row and the balance update commit in the same transaction, so a
//! reward is never granted without its check-in record or vice versa.
//!
//! Calendar days are UTC.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use kudos_core::{checkin_reward, streak_from_dates, validate_delta, STREAK_SCAN_LIMIT};
use kudos_types::{CheckinOutcome, LeaderboardEntry, PointsSummary, ServerId, UserId};

use crate::error::{is_unique_violation, DbError};
use crate::executor::with_retries;

/// Operations on the `user_points` and `daily_checkins` tables.
pub struct PointsStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PointsStore<'a> {
    /// Create a new points store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Current points and check-in count for a member, zero when no
    /// account exists.
    ///
    /// Never fails the caller: on any storage error the zero summary is
    /// returned and the error is logged. Balance displays degrade
    /// rather than blocking the caller.
    pub async fn user_points(&self, user: UserId, server: ServerId) -> PointsSummary {
        let pool = self.pool;
        let result = with_retries("user_points", || async move {
            sqlx::query_as::<_, (i64, i64)>(
                r"SELECT COALESCE(points, 0), COALESCE(total_checkins, 0)
                  FROM user_points
                  WHERE user_id = $1 AND server_id = $2",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .fetch_optional(pool)
            .await
        })
        .await;

        match result {
            Ok(Some((points, total_checkins))) => PointsSummary {
                points,
                total_checkins,
            },
            Ok(None) => PointsSummary::default(),
            Err(err) => {
                tracing::error!(
                    %user,
                    %server,
                    error = %err,
                    "failed to read user points, returning zero summary"
                );
                PointsSummary::default()
            }
        }
    }

    /// Apply a bounded point delta to a member's balance.
    ///
    /// Creates the account at zero when absent and floors the balance
    /// at zero: a large negative delta on a low balance clamps to zero
    /// rather than going negative. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] when `|delta|` exceeds the
    /// accepted magnitude (checked before any connection is touched),
    /// or [`DbError::Postgres`] on storage failure.
    pub async fn add_points(
        &self,
        user: UserId,
        server: ServerId,
        delta: i64,
    ) -> Result<i64, DbError> {
        validate_delta(delta)?;

        let pool = self.pool;
        let (points,) = with_retries("add_points", || async move {
            sqlx::query_as::<_, (i64,)>(
                r"INSERT INTO user_points (user_id, server_id, points, total_checkins)
                  VALUES ($1, $2, GREATEST(0, $3), 0)
                  ON CONFLICT (user_id, server_id)
                  DO UPDATE SET
                      points = GREATEST(0, user_points.points + $3),
                      updated_at = NOW()
                  RETURNING points",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(delta)
            .fetch_one(pool)
            .await
        })
        .await?;

        Ok(points)
    }

    /// Perform today's daily check-in for a member.
    ///
    /// See [`PointsStore::checkin_on`] for the full contract.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on storage failure.
    pub async fn daily_checkin(
        &self,
        user: UserId,
        server: ServerId,
    ) -> Result<CheckinOutcome, DbError> {
        self.checkin_on(user, server, Utc::now().date_naive()).await
    }

    /// Perform the daily check-in for a member on the given calendar
    /// day.
    ///
    /// At most one check-in exists per (user, server, day). The fast
    /// path answers a repeat call from the existing row without opening
    /// a transaction. Otherwise the streak is continued from
    /// yesterday's recorded `streak_count` (a gap always resets the
    /// chain), and the check-in row plus the balance update commit
    /// atomically. When a concurrent caller wins the insert, the
    /// transaction is discarded and the winner's recorded values are
    /// reported.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on storage failure.
    pub async fn checkin_on(
        &self,
        user: UserId,
        server: ServerId,
        today: NaiveDate,
    ) -> Result<CheckinOutcome, DbError> {
        // Pre-check outside any transaction: the common repeat call
        // answers without contending for row locks.
        if let Some((points, streak)) = self.checkin_record(user, server, today).await? {
            return Ok(CheckinOutcome::already_checked_in(points, streak));
        }

        let yesterday = today.pred_opt();
        let pool = self.pool;

        let won = with_retries("daily_checkin", || async move {
            let mut tx = pool.begin().await?;

            let prev_streak = match yesterday {
                Some(date) => sqlx::query_scalar::<_, i64>(
                    r"SELECT streak_count FROM daily_checkins
                      WHERE user_id = $1 AND server_id = $2 AND checkin_date = $3",
                )
                .bind(user.into_inner())
                .bind(server.into_inner())
                .bind(date)
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or(0),
                None => 0,
            };

            let streak = prev_streak.saturating_add(1);
            let reward = checkin_reward(streak);

            let inserted = sqlx::query(
                r"INSERT INTO daily_checkins
                      (user_id, server_id, checkin_date, points_earned, streak_count)
                  VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(today)
            .bind(reward)
            .bind(streak)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(err) if is_unique_violation(&err) => {
                    // A concurrent caller won today's insert. Discard
                    // everything; the winner's row is re-read below.
                    tx.rollback().await?;
                    return Ok(None);
                }
                Err(err) => return Err(err),
            }

            let (total,): (i64,) = sqlx::query_as(
                r"INSERT INTO user_points (user_id, server_id, points, total_checkins)
                  VALUES ($1, $2, $3, 1)
                  ON CONFLICT (user_id, server_id)
                  DO UPDATE SET
                      points = user_points.points + $3,
                      total_checkins = user_points.total_checkins + 1,
                      updated_at = NOW()
                  RETURNING points",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(reward)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(Some((reward, streak, total)))
        })
        .await?;

        match won {
            Some((reward, streak, total)) => {
                tracing::debug!(%user, %server, %today, reward, streak, "daily check-in recorded");
                Ok(CheckinOutcome::won(reward, streak, total))
            }
            None => {
                let (points, streak) = self
                    .checkin_record(user, server, today)
                    .await?
                    .unwrap_or((0, 0));
                Ok(CheckinOutcome::already_checked_in(points, streak))
            }
        }
    }

    /// Recompute the member's streak from recorded check-in dates as of
    /// today (UTC).
    ///
    /// Audit and recomputation helper: the live streak used during
    /// check-in comes from the stored previous day's `streak_count`,
    /// not from this scan.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn calculate_streak(&self, user: UserId, server: ServerId) -> Result<u32, DbError> {
        self.calculate_streak_on(user, server, Utc::now().date_naive())
            .await
    }

    /// Recompute the member's streak as of the given day.
    ///
    /// Scans up to the most recent [`STREAK_SCAN_LIMIT`] check-in dates
    /// in descending order and walks backward one calendar day at a
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn calculate_streak_on(
        &self,
        user: UserId,
        server: ServerId,
        today: NaiveDate,
    ) -> Result<u32, DbError> {
        let pool = self.pool;
        let dates = with_retries("calculate_streak", || async move {
            sqlx::query_scalar::<_, NaiveDate>(
                r"SELECT checkin_date FROM daily_checkins
                  WHERE user_id = $1 AND server_id = $2
                  ORDER BY checkin_date DESC
                  LIMIT $3",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(STREAK_SCAN_LIMIT)
            .fetch_all(pool)
            .await
        })
        .await?;

        Ok(streak_from_dates(today, &dates))
    }

    /// The tenant's points leaderboard, ordered by points descending
    /// with 1-based ranks assigned by position.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn leaderboard(
        &self,
        server: ServerId,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, DbError> {
        let pool = self.pool;
        let rows = with_retries("leaderboard", || async move {
            sqlx::query_as::<_, (i64, i64, i64)>(
                r"SELECT user_id, points, total_checkins
                  FROM user_points
                  WHERE server_id = $1
                  ORDER BY points DESC
                  LIMIT $2",
            )
            .bind(server.into_inner())
            .bind(limit)
            .fetch_all(pool)
            .await
        })
        .await?;

        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(index, (user_id, points, total_checkins))| LeaderboardEntry {
                rank: u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1),
                user_id: UserId::new(user_id),
                points,
                total_checkins,
            })
            .collect();

        Ok(entries)
    }

    /// The member's check-in row for the given day, if present.
    async fn checkin_record(
        &self,
        user: UserId,
        server: ServerId,
        date: NaiveDate,
    ) -> Result<Option<(i64, i64)>, DbError> {
        let pool = self.pool;
        with_retries("checkin_record", || async move {
            sqlx::query_as::<_, (i64, i64)>(
                r"SELECT points_earned, streak_count FROM daily_checkins
                  WHERE user_id = $1 AND server_id = $2 AND checkin_date = $3",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(date)
            .fetch_optional(pool)
            .await
        })
        .await
    }
}
