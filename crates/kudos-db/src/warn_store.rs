//! Moderation warnings.
//!
//! Warn ids are a per-(user, server) sequence assigned at insert time,
//! not a global sequence: the first warning for a member in a tenant is
//! id 1. Assignment is a read followed by an insert; two concurrent
//! warns for the same member can compute the same next id and the
//! second insert fails on the primary key (see `DESIGN.md`).

use sqlx::PgPool;

use kudos_types::{ServerId, UserId};

use crate::error::DbError;
use crate::executor::with_retries;

/// A row from the `warns` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WarnRow {
    /// Per-(user, server) warn sequence number.
    pub id: i64,
    /// The warned member.
    pub user_id: i64,
    /// The tenant the warning was issued in.
    pub server_id: i64,
    /// The moderator who issued the warning.
    pub moderator_id: i64,
    /// Reason recorded with the warning.
    pub reason: String,
    /// When the warning was issued.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Operations on the `warns` table.
pub struct WarnStore<'a> {
    pool: &'a PgPool,
}

impl<'a> WarnStore<'a> {
    /// Create a new warn store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a warning and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the read or insert fails,
    /// including the id-collision case under concurrent warns for the
    /// same member.
    pub async fn add_warn(
        &self,
        user: UserId,
        server: ServerId,
        moderator: UserId,
        reason: &str,
    ) -> Result<i64, DbError> {
        let pool = self.pool;

        let next_id = with_retries("next_warn_id", || async move {
            sqlx::query_scalar::<_, i64>(
                r"SELECT id FROM warns
                  WHERE user_id = $1 AND server_id = $2
                  ORDER BY id DESC
                  LIMIT 1",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .fetch_optional(pool)
            .await
        })
        .await?
        .map_or(1, |last| last.saturating_add(1));

        with_retries("add_warn", || async move {
            sqlx::query(
                r"INSERT INTO warns (id, user_id, server_id, moderator_id, reason)
                  VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(next_id)
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(moderator.into_inner())
            .bind(reason)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await?;

        tracing::info!(%user, %server, %moderator, warn_id = next_id, "warning recorded");
        Ok(next_id)
    }

    /// Delete a warning by its composite key and return the member's
    /// remaining warning count.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete or count fails.
    pub async fn remove_warn(
        &self,
        warn_id: i64,
        user: UserId,
        server: ServerId,
    ) -> Result<i64, DbError> {
        let pool = self.pool;
        with_retries("remove_warn", || async move {
            sqlx::query(r"DELETE FROM warns WHERE id = $1 AND user_id = $2 AND server_id = $3")
                .bind(warn_id)
                .bind(user.into_inner())
                .bind(server.into_inner())
                .execute(pool)
                .await?;
            Ok(())
        })
        .await?;

        self.warnings_count(user, server).await
    }

    /// All warnings recorded for a member within a tenant, oldest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn warnings(&self, user: UserId, server: ServerId) -> Result<Vec<WarnRow>, DbError> {
        let pool = self.pool;
        with_retries("warnings", || async move {
            sqlx::query_as::<_, WarnRow>(
                r"SELECT id, user_id, server_id, moderator_id, reason, created_at
                  FROM warns
                  WHERE user_id = $1 AND server_id = $2
                  ORDER BY id",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .fetch_all(pool)
            .await
        })
        .await
    }

    /// Number of warnings recorded for a member within a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn warnings_count(&self, user: UserId, server: ServerId) -> Result<i64, DbError> {
        let pool = self.pool;
        with_retries("warnings_count", || async move {
            sqlx::query_scalar::<_, i64>(
                r"SELECT COUNT(*) FROM warns WHERE user_id = $1 AND server_id = $2",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .fetch_one(pool)
            .await
        })
        .await
    }
}
