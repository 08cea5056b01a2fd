//! Per-tenant configuration and pending OAuth handshakes.
//!
//! Configuration is a plain (server, key) -> value string map with
//! upsert semantics; reads optionally fall back to the reserved global
//! scope. Pending OAuth rows are single-use and time-boxed: taking one
//! deletes it in the same statement, so concurrent redeemers cannot
//! both succeed.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use kudos_types::{ServerId, UserId};

use crate::error::DbError;
use crate::executor::with_retries;

/// Configuration key for the auto-detected Twitter handle.
const AUTO_DETECT_USERNAME_KEY: &str = "auto_detect_twitter_username";

/// Configuration key for the auto-detected Twitter account id.
const AUTO_DETECT_USER_ID_KEY: &str = "auto_detect_twitter_user_id";

/// A redeemed row from the `oauth_pending` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OauthPendingRow {
    /// PKCE code verifier stored at authorization start.
    pub code_verifier: String,
    /// The member who initiated the handshake.
    pub discord_user_id: i64,
}

/// Operations on the `server_config` and `oauth_pending` tables.
pub struct ConfigStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ConfigStore<'a> {
    /// Create a new config store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Upsert one configuration value for a tenant.
    ///
    /// Best-effort: failures are logged and reported as `false`.
    pub async fn set_server_config(&self, server: ServerId, key: &str, value: &str) -> bool {
        let pool = self.pool;
        let result = with_retries("set_server_config", || async move {
            sqlx::query(
                r"INSERT INTO server_config (server_id, config_key, config_value, updated_at)
                  VALUES ($1, $2, $3, NOW())
                  ON CONFLICT (server_id, config_key)
                  DO UPDATE SET config_value = $3, updated_at = NOW()",
            )
            .bind(server.into_inner())
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(%server, key, error = %err, "failed to set server config");
                false
            }
        }
    }

    /// Read one configuration value for a tenant, without fallback.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn server_config(
        &self,
        server: ServerId,
        key: &str,
    ) -> Result<Option<String>, DbError> {
        let pool = self.pool;
        with_retries("server_config", || async move {
            sqlx::query_scalar::<_, String>(
                r"SELECT config_value FROM server_config
                  WHERE server_id = $1 AND config_key = $2",
            )
            .bind(server.into_inner())
            .bind(key)
            .fetch_optional(pool)
            .await
        })
        .await
    }

    /// Read one configuration value, falling back to the global scope
    /// when the tenant has no row of its own.
    ///
    /// Absent in both scopes is an absent value, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn config_with_fallback(
        &self,
        server: ServerId,
        key: &str,
    ) -> Result<Option<String>, DbError> {
        if let Some(value) = self.server_config(server, key).await? {
            return Ok(Some(value));
        }
        if server.is_global() {
            return Ok(None);
        }
        self.server_config(ServerId::GLOBAL, key).await
    }

    /// The auto-detected Twitter handle configured for a tenant, with
    /// global fallback.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn auto_detect_twitter_username(
        &self,
        server: ServerId,
    ) -> Result<Option<String>, DbError> {
        self.config_with_fallback(server, AUTO_DETECT_USERNAME_KEY)
            .await
    }

    /// The auto-detected Twitter account id configured for a tenant,
    /// with global fallback.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn auto_detect_twitter_user_id(
        &self,
        server: ServerId,
    ) -> Result<Option<String>, DbError> {
        self.config_with_fallback(server, AUTO_DETECT_USER_ID_KEY)
            .await
    }

    /// Store a pending OAuth handshake keyed by its `state` value.
    ///
    /// Re-posting the same state refreshes the verifier and deadline.
    /// Best-effort: failures are logged and reported as `false`.
    pub async fn store_oauth_verifier(
        &self,
        state: &str,
        code_verifier: &str,
        user: UserId,
        ttl_minutes: i64,
    ) -> bool {
        let Some(expires_at) = Duration::try_minutes(ttl_minutes)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        else {
            tracing::error!(ttl_minutes, "oauth verifier ttl out of range");
            return false;
        };

        let pool = self.pool;
        let result = with_retries("store_oauth_verifier", || async move {
            sqlx::query(
                r"INSERT INTO oauth_pending (state, code_verifier, discord_user_id, expires_at)
                  VALUES ($1, $2, $3, $4)
                  ON CONFLICT (state)
                  DO UPDATE SET
                      code_verifier = $2,
                      discord_user_id = $3,
                      expires_at = $4",
            )
            .bind(state)
            .bind(code_verifier)
            .bind(user.into_inner())
            .bind(expires_at)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(%user, error = %err, "failed to store oauth verifier");
                false
            }
        }
    }

    /// Redeem a pending OAuth handshake: return and delete it in one
    /// statement.
    ///
    /// Expired or unknown states redeem to `None`. Best-effort:
    /// storage failures are logged and degrade to `None`.
    pub async fn take_oauth_verifier(&self, state: &str) -> Option<OauthPendingRow> {
        let pool = self.pool;
        let result = with_retries("take_oauth_verifier", || async move {
            sqlx::query_as::<_, OauthPendingRow>(
                r"DELETE FROM oauth_pending
                  WHERE state = $1 AND expires_at > NOW()
                  RETURNING code_verifier, discord_user_id",
            )
            .bind(state)
            .fetch_optional(pool)
            .await
        })
        .await;

        match result {
            Ok(row) => row,
            Err(err) => {
                tracing::error!(error = %err, "failed to redeem oauth verifier");
                None
            }
        }
    }

    /// Delete expired pending OAuth rows. Returns the number deleted.
    ///
    /// Best-effort maintenance: failures are logged and reported as
    /// zero.
    pub async fn cleanup_expired_oauth_verifiers(&self) -> u64 {
        let pool = self.pool;
        let result = with_retries("cleanup_expired_oauth_verifiers", || async move {
            let outcome = sqlx::query(r"DELETE FROM oauth_pending WHERE expires_at <= NOW()")
                .execute(pool)
                .await?;
            Ok(outcome.rows_affected())
        })
        .await;

        match result {
            Ok(deleted) => deleted,
            Err(err) => {
                tracing::error!(error = %err, "failed to clean up expired oauth verifiers");
                0
            }
        }
    }
}
