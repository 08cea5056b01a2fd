//! Early-role member profiles.
//!
//! A small upsertable profile row per (guild, member), currently
//! holding an optional wallet address. Upserts keep an existing wallet
//! when the new one is absent.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kudos_types::{ServerId, UserId};

use crate::error::DbError;
use crate::executor::with_retries;

/// A row from the `early_role_members` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EarlyRoleMemberRow {
    /// The member.
    pub user_id: i64,
    /// The guild the role was earned in.
    pub guild_id: i64,
    /// Wallet address supplied by the member, if any.
    pub wallet_address: Option<String>,
    /// When the profile row was created.
    pub created_at: DateTime<Utc>,
    /// When the profile row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Operations on the `early_role_members` table.
pub struct MemberStore<'a> {
    pool: &'a PgPool,
}

impl<'a> MemberStore<'a> {
    /// Create a new member store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a member's profile row.
    ///
    /// An absent `wallet_address` never clears a stored one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert_member(
        &self,
        guild: ServerId,
        user: UserId,
        wallet_address: Option<&str>,
    ) -> Result<(), DbError> {
        let pool = self.pool;
        with_retries("upsert_member", || async move {
            sqlx::query(
                r"INSERT INTO early_role_members
                      (user_id, guild_id, wallet_address, created_at, updated_at)
                  VALUES ($1, $2, $3, NOW(), NOW())
                  ON CONFLICT (guild_id, user_id)
                  DO UPDATE SET
                      wallet_address =
                          COALESCE(EXCLUDED.wallet_address, early_role_members.wallet_address),
                      updated_at = NOW()",
            )
            .bind(user.into_inner())
            .bind(guild.into_inner())
            .bind(wallet_address)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await
    }

    /// A member's profile row, if present.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn member(
        &self,
        guild: ServerId,
        user: UserId,
    ) -> Result<Option<EarlyRoleMemberRow>, DbError> {
        let pool = self.pool;
        with_retries("member", || async move {
            sqlx::query_as::<_, EarlyRoleMemberRow>(
                r"SELECT user_id, guild_id, wallet_address, created_at, updated_at
                  FROM early_role_members
                  WHERE guild_id = $1 AND user_id = $2",
            )
            .bind(guild.into_inner())
            .bind(user.into_inner())
            .fetch_optional(pool)
            .await
        })
        .await
    }

    /// Overwrite a member's wallet address, optionally scoped to one
    /// guild. Returns whether any row was updated.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_wallet(
        &self,
        user: UserId,
        guild: Option<ServerId>,
        wallet_address: &str,
    ) -> Result<bool, DbError> {
        let pool = self.pool;
        let updated = match guild {
            Some(guild) => {
                with_retries("update_wallet", || async move {
                    let result = sqlx::query(
                        r"UPDATE early_role_members
                          SET wallet_address = $1, updated_at = NOW()
                          WHERE user_id = $2 AND guild_id = $3",
                    )
                    .bind(wallet_address)
                    .bind(user.into_inner())
                    .bind(guild.into_inner())
                    .execute(pool)
                    .await?;
                    Ok(result.rows_affected())
                })
                .await?
            }
            None => {
                with_retries("update_wallet", || async move {
                    let result = sqlx::query(
                        r"UPDATE early_role_members
                          SET wallet_address = $1, updated_at = NOW()
                          WHERE user_id = $2",
                    )
                    .bind(wallet_address)
                    .bind(user.into_inner())
                    .execute(pool)
                    .await?;
                    Ok(result.rows_affected())
                })
                .await?
            }
        };

        Ok(updated > 0)
    }
}
