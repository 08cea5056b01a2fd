//! Social bindings, target tweets, and action verification.
//!
//! Lookups resolve server-scoped rows first and fall back to the
//! reserved global scope ([`ServerId::GLOBAL`]) when the tenant has no
//! row of its own. Verification records are protected by a uniqueness
//! constraint over (user, server, tweet, action): crediting the same
//! action twice is reported as a negative outcome, never an error.
//!
//! OAuth credential material is stored as supplied; refreshing tokens
//! against the Twitter API is the caller's responsibility.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kudos_core::FIRST_BIND_BONUS_POINTS;
use kudos_types::{BindOutcome, ServerId, TweetId, TwitterAction, UserId};

use crate::error::{is_unique_violation, DbError};
use crate::executor::with_retries;

/// Default points for liking a target tweet.
const DEFAULT_LIKE_POINTS: i64 = 5;

/// Default points for retweeting a target tweet.
const DEFAULT_RETWEET_POINTS: i64 = 10;

/// Default points for replying to a target tweet.
const DEFAULT_REPLY_POINTS: i64 = 15;

/// Default bonus for completing all three actions on one tweet.
const DEFAULT_TRIPLE_BONUS_POINTS: i64 = 20;

/// A row from the `twitter_bindings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TwitterBindingRow {
    /// Bound Twitter account id.
    pub twitter_user_id: String,
    /// Bound Twitter handle.
    pub twitter_username: String,
    /// Whether the binding has been verified.
    pub verified: bool,
    /// OAuth access token, when stored.
    pub access_token: Option<String>,
    /// OAuth refresh token, when stored.
    pub refresh_token: Option<String>,
    /// Access token expiry, when known.
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// A row from the `twitter_target_tweets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TargetTweetRow {
    /// The tracked tweet id.
    pub tweet_id: String,
    /// Canonical tweet URL.
    pub tweet_url: String,
    /// Operator-supplied description, if any.
    pub description: Option<String>,
    /// Points for a like.
    pub like_points: i64,
    /// Points for a retweet.
    pub retweet_points: i64,
    /// Points for a reply.
    pub reply_points: i64,
    /// Bonus for completing all three actions.
    pub triple_bonus_points: i64,
}

/// A row from the `twitter_verifications` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationRow {
    /// The verified tweet id.
    pub tweet_id: String,
    /// The verified action, as stored.
    pub action_type: String,
    /// Points credited for the action.
    pub points_earned: i64,
    /// When the verification was recorded.
    pub verified_at: DateTime<Utc>,
}

/// Parameters for binding a Twitter account to a member.
#[derive(Debug, Clone, Copy)]
pub struct BindParams<'a> {
    /// The member binding the account.
    pub user: UserId,
    /// The tenant scope of the binding ([`ServerId::GLOBAL`] for a
    /// cross-server binding).
    pub server: ServerId,
    /// Twitter account id.
    pub twitter_user_id: &'a str,
    /// Twitter handle.
    pub twitter_username: &'a str,
    /// OAuth access token, when available.
    pub access_token: Option<&'a str>,
    /// OAuth refresh token, when available.
    pub refresh_token: Option<&'a str>,
    /// Access token expiry, when known.
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Parameters for registering a tweet whose actions earn points.
#[derive(Debug, Clone, Copy)]
pub struct TargetTweetParams<'a> {
    /// The tenant the tweet is tracked for ([`ServerId::GLOBAL`] for
    /// the shared default set).
    pub server: ServerId,
    /// The tracked tweet id.
    pub tweet: &'a TweetId,
    /// Canonical tweet URL.
    pub tweet_url: &'a str,
    /// Operator-supplied description.
    pub description: Option<&'a str>,
    /// Points for a like.
    pub like_points: i64,
    /// Points for a retweet.
    pub retweet_points: i64,
    /// Points for a reply.
    pub reply_points: i64,
    /// Bonus for completing all three actions.
    pub triple_bonus_points: i64,
}

impl<'a> TargetTweetParams<'a> {
    /// Create parameters with the default reward schedule.
    pub const fn new(server: ServerId, tweet: &'a TweetId, tweet_url: &'a str) -> Self {
        Self {
            server,
            tweet,
            tweet_url,
            description: None,
            like_points: DEFAULT_LIKE_POINTS,
            retweet_points: DEFAULT_RETWEET_POINTS,
            reply_points: DEFAULT_REPLY_POINTS,
            triple_bonus_points: DEFAULT_TRIPLE_BONUS_POINTS,
        }
    }
}

/// Operations on the `twitter_bindings`, `twitter_target_tweets`, and
/// `twitter_verifications` tables.
pub struct TwitterStore<'a> {
    pool: &'a PgPool,
}

impl<'a> TwitterStore<'a> {
    /// Create a new Twitter store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Bind a Twitter account to a member, upserting credentials.
    ///
    /// A first-time binding grants the one-time bonus to the member's
    /// global account in the same transaction as the binding row;
    /// repeat binds refresh credentials and grant nothing. Best-effort:
    /// an unexpected storage failure is logged and reported as a failed
    /// outcome rather than an error.
    pub async fn bind_twitter_account(&self, params: BindParams<'_>) -> BindOutcome {
        match self.try_bind(params).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    user = %params.user,
                    server = %params.server,
                    error = %err,
                    "failed to bind twitter account"
                );
                BindOutcome::failed()
            }
        }
    }

    async fn try_bind(&self, params: BindParams<'_>) -> Result<BindOutcome, DbError> {
        let pool = self.pool;

        let outcome = with_retries("bind_twitter_account", || async move {
            let mut tx = pool.begin().await?;

            let existing = sqlx::query_scalar::<_, i32>(
                r"SELECT 1 FROM twitter_bindings WHERE user_id = $1 AND server_id = $2",
            )
            .bind(params.user.into_inner())
            .bind(params.server.into_inner())
            .fetch_optional(&mut *tx)
            .await?;
            let is_first_time = existing.is_none();

            sqlx::query(
                r"INSERT INTO twitter_bindings
                      (user_id, server_id, twitter_user_id, twitter_username,
                       access_token, refresh_token, token_expires_at, verified, updated_at)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, NOW())
                  ON CONFLICT (user_id, server_id)
                  DO UPDATE SET
                      twitter_user_id = $3,
                      twitter_username = $4,
                      access_token = $5,
                      refresh_token = $6,
                      token_expires_at = $7,
                      verified = TRUE,
                      updated_at = NOW()",
            )
            .bind(params.user.into_inner())
            .bind(params.server.into_inner())
            .bind(params.twitter_user_id)
            .bind(params.twitter_username)
            .bind(params.access_token)
            .bind(params.refresh_token)
            .bind(params.token_expires_at)
            .execute(&mut *tx)
            .await?;

            if is_first_time {
                sqlx::query(
                    r"INSERT INTO user_points (user_id, server_id, points, total_checkins)
                      VALUES ($1, $2, $3, 0)
                      ON CONFLICT (user_id, server_id)
                      DO UPDATE SET
                          points = user_points.points + $3,
                          updated_at = NOW()",
                )
                .bind(params.user.into_inner())
                .bind(ServerId::GLOBAL.into_inner())
                .bind(FIRST_BIND_BONUS_POINTS)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(is_first_time)
        })
        .await?;

        if outcome {
            tracing::info!(
                user = %params.user,
                bonus = FIRST_BIND_BONUS_POINTS,
                "first twitter binding, credited global bonus"
            );
            Ok(BindOutcome::first_bind(FIRST_BIND_BONUS_POINTS))
        } else {
            Ok(BindOutcome::rebind())
        }
    }

    /// The member's Twitter binding, resolving the server scope first
    /// and falling back to the global scope.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn twitter_binding(
        &self,
        user: UserId,
        server: ServerId,
    ) -> Result<Option<TwitterBindingRow>, DbError> {
        if let Some(row) = self.binding_in_scope(user, server).await? {
            return Ok(Some(row));
        }
        if server.is_global() {
            return Ok(None);
        }
        self.binding_in_scope(user, ServerId::GLOBAL).await
    }

    /// Refresh stored OAuth credential material for a Twitter account.
    ///
    /// Best-effort: failures are logged and reported as `false`.
    pub async fn update_twitter_token(
        &self,
        twitter_user_id: &str,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> bool {
        let pool = self.pool;
        let result = with_retries("update_twitter_token", || async move {
            sqlx::query(
                r"UPDATE twitter_bindings
                  SET access_token = $1, refresh_token = $2,
                      token_expires_at = $3, updated_at = NOW()
                  WHERE twitter_user_id = $4",
            )
            .bind(access_token)
            .bind(refresh_token)
            .bind(expires_at)
            .bind(twitter_user_id)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(twitter_user_id, error = %err, "failed to update twitter token");
                false
            }
        }
    }

    /// Register or update a tracked tweet and its reward schedule.
    ///
    /// Best-effort: failures are logged and reported as `false`.
    pub async fn add_target_tweet(&self, params: TargetTweetParams<'_>) -> bool {
        let pool = self.pool;
        let result = with_retries("add_target_tweet", || async move {
            sqlx::query(
                r"INSERT INTO twitter_target_tweets
                      (server_id, tweet_id, tweet_url, description, like_points,
                       retweet_points, reply_points, triple_bonus_points)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                  ON CONFLICT (server_id, tweet_id)
                  DO UPDATE SET
                      tweet_url = $3,
                      description = $4,
                      like_points = $5,
                      retweet_points = $6,
                      reply_points = $7,
                      triple_bonus_points = $8",
            )
            .bind(params.server.into_inner())
            .bind(params.tweet.as_str())
            .bind(params.tweet_url)
            .bind(params.description)
            .bind(params.like_points)
            .bind(params.retweet_points)
            .bind(params.reply_points)
            .bind(params.triple_bonus_points)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    server = %params.server,
                    tweet = %params.tweet,
                    error = %err,
                    "failed to add target tweet"
                );
                false
            }
        }
    }

    /// Active tracked tweets for a tenant, falling back to the global
    /// default set when the tenant has none.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn target_tweets(&self, server: ServerId) -> Result<Vec<TargetTweetRow>, DbError> {
        let rows = self.target_tweets_in_scope(server).await?;
        if !rows.is_empty() || server.is_global() {
            return Ok(rows);
        }
        self.target_tweets_in_scope(ServerId::GLOBAL).await
    }

    /// Record a verified social action and credit its points.
    ///
    /// The verification row and the balance credit commit in one
    /// transaction. Returns `false` without any effect when the same
    /// action was already credited for this (user, tweet) -- the
    /// uniqueness constraint is the arbiter under concurrent attempts.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on storage failure other than the
    /// duplicate-credit case.
    pub async fn record_twitter_verification(
        &self,
        user: UserId,
        server: ServerId,
        twitter_username: &str,
        tweet: &TweetId,
        action: TwitterAction,
        points_earned: i64,
    ) -> Result<bool, DbError> {
        let pool = self.pool;
        let tweet_id = tweet.as_str();

        let recorded = with_retries("record_twitter_verification", || async move {
            let mut tx = pool.begin().await?;

            let inserted = sqlx::query(
                r"INSERT INTO twitter_verifications
                      (user_id, server_id, twitter_username, tweet_id,
                       action_type, points_earned)
                  VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(user.into_inner())
            .bind(server.into_inner())
            .bind(twitter_username)
            .bind(tweet_id)
            .bind(action.as_db())
            .bind(points_earned)
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

            if points_earned > 0 {
                sqlx::query(
                    r"INSERT INTO user_points (user_id, server_id, points, total_checkins)
                      VALUES ($1, $2, $3, 0)
                      ON CONFLICT (user_id, server_id)
                      DO UPDATE SET
                          points = user_points.points + $3,
                          updated_at = NOW()",
                )
                .bind(user.into_inner())
                .bind(server.into_inner())
                .bind(points_earned)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(true)
        })
        .await?;

        if recorded {
            tracing::debug!(%user, %server, tweet = tweet_id, %action, points_earned, "twitter action verified");
        }
        Ok(recorded)
    }

    /// The member's verification records, newest first, falling back
    /// to the global scope when the tenant has none.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn user_twitter_verifications(
        &self,
        user: UserId,
        server: ServerId,
    ) -> Result<Vec<VerificationRow>, DbError> {
        let rows = self.verifications_in_scope(user, server).await?;
        if !rows.is_empty() || server.is_global() {
            return Ok(rows);
        }
        self.verifications_in_scope(user, ServerId::GLOBAL).await
    }

    /// Whether the member has completed the triple action (like,
    /// retweet, and reply) on a tweet, with global-scope fallback.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn check_triple_action(
        &self,
        user: UserId,
        server: ServerId,
        tweet: &TweetId,
    ) -> Result<bool, DbError> {
        let expected = i64::try_from(TwitterAction::ALL.len()).unwrap_or(i64::MAX);

        let count = self.distinct_actions(user, server, tweet).await?;
        if count == 0 && !server.is_global() {
            let fallback = self.distinct_actions(user, ServerId::GLOBAL, tweet).await?;
            return Ok(fallback == expected);
        }
        Ok(count == expected)
    }

    /// The member's binding row in exactly one scope.
    async fn binding_in_scope(
        &self,
        user: UserId,
        scope: ServerId,
    ) -> Result<Option<TwitterBindingRow>, DbError> {
        let pool = self.pool;
        with_retries("twitter_binding", || async move {
            sqlx::query_as::<_, TwitterBindingRow>(
                r"SELECT twitter_user_id, twitter_username, verified,
                         access_token, refresh_token, token_expires_at
                  FROM twitter_bindings
                  WHERE user_id = $1 AND server_id = $2",
            )
            .bind(user.into_inner())
            .bind(scope.into_inner())
            .fetch_optional(pool)
            .await
        })
        .await
    }

    /// Active tracked tweets in exactly one scope.
    async fn target_tweets_in_scope(
        &self,
        scope: ServerId,
    ) -> Result<Vec<TargetTweetRow>, DbError> {
        let pool = self.pool;
        with_retries("target_tweets", || async move {
            sqlx::query_as::<_, TargetTweetRow>(
                r"SELECT tweet_id, tweet_url, description, like_points,
                         retweet_points, reply_points, triple_bonus_points
                  FROM twitter_target_tweets
                  WHERE server_id = $1 AND is_active = TRUE",
            )
            .bind(scope.into_inner())
            .fetch_all(pool)
            .await
        })
        .await
    }

    /// The member's verification rows in exactly one scope, newest
    /// first.
    async fn verifications_in_scope(
        &self,
        user: UserId,
        scope: ServerId,
    ) -> Result<Vec<VerificationRow>, DbError> {
        let pool = self.pool;
        with_retries("user_twitter_verifications", || async move {
            sqlx::query_as::<_, VerificationRow>(
                r"SELECT tweet_id, action_type, points_earned, verified_at
                  FROM twitter_verifications
                  WHERE user_id = $1 AND server_id = $2
                  ORDER BY verified_at DESC",
            )
            .bind(user.into_inner())
            .bind(scope.into_inner())
            .fetch_all(pool)
            .await
        })
        .await
    }

    /// Distinct verified triple-action types for a (user, tweet) pair
    /// in exactly one scope.
    async fn distinct_actions(
        &self,
        user: UserId,
        scope: ServerId,
        tweet: &TweetId,
    ) -> Result<i64, DbError> {
        let pool = self.pool;
        let tweet_id = tweet.as_str();
        with_retries("check_triple_action", || async move {
            sqlx::query_scalar::<_, i64>(
                r"SELECT COUNT(DISTINCT action_type) FROM twitter_verifications
                  WHERE user_id = $1 AND server_id = $2 AND tweet_id = $3
                    AND action_type IN ('like', 'retweet', 'reply')",
            )
            .bind(user.into_inner())
            .bind(scope.into_inner())
            .bind(tweet_id)
            .fetch_one(pool)
            .await
        })
        .await
    }
}
