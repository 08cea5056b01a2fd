//! `PostgreSQL` storage layer for the Kudos points ledger.
//!
//! Every reward, streak, warning, binding, and audit record lives in
//! `PostgreSQL`. This crate owns the connection pool, wraps every query
//! in a bounded-retry envelope, and exposes one store per table family.
//! Stores are thin handles over a shared [`sqlx::PgPool`]; all
//! multi-statement mutations are transaction-scoped so partial writes
//! are never visible.
//!
//! # Architecture
//!
//! ```text
//! Bot / HTTP collaborators
//!     |
//!     +-- PointsStore    (user_points, daily_checkins, leaderboard)
//!     +-- WarnStore      (warns)
//!     +-- ActivityStore  (message_logs, daily_activity_rewards)
//!     +-- TwitterStore   (bindings, target tweets, verifications)
//!     +-- ConfigStore    (server_config, oauth_pending)
//!     +-- AuditStore     (admin_audit_logs)
//!     +-- MemberStore    (early_role_members)
//!             |
//!         executor::with_retries  (the sole query path)
//!             |
//!         PostgresPool  (bounded sqlx pool)
//! ```
//!
//! Concurrent check-ins for the same (user, server, day) are serialized
//! by the day-uniqueness constraint: exactly one caller wins, every
//! other caller observes the winner's reward and streak.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time
//! checked) to avoid requiring a live database at build time. All
//! queries are parameterized to prevent SQL injection.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool configuration and management
//! - [`executor`] -- bounded-retry query envelope
//! - [`points_store`] -- point balances, daily check-ins, leaderboard
//! - [`warn_store`] -- moderation warnings
//! - [`activity_store`] -- message activity rewards and retention
//! - [`twitter_store`] -- social bindings and action verification
//! - [`config_store`] -- per-tenant configuration and OAuth handshakes
//! - [`audit_store`] -- administrative audit trail
//! - [`member_store`] -- early-role member profiles
//! - [`error`] -- shared error types and failure classification

pub mod activity_store;
pub mod audit_store;
pub mod config_store;
pub mod error;
pub mod executor;
pub mod member_store;
pub mod points_store;
pub mod postgres;
pub mod twitter_store;
pub mod warn_store;

// Re-export primary types for convenience.
pub use activity_store::ActivityStore;
pub use audit_store::{AdminAuditRow, AdminLogParams, AuditStore};
pub use config_store::{ConfigStore, OauthPendingRow};
pub use error::DbError;
pub use executor::with_retries;
pub use member_store::{EarlyRoleMemberRow, MemberStore};
pub use points_store::PointsStore;
pub use postgres::{PoolStatus, PostgresConfig, PostgresPool};
pub use twitter_store::{
    BindParams, TargetTweetParams, TargetTweetRow, TwitterBindingRow, TwitterStore,
    VerificationRow,
};
pub use warn_store::{WarnRow, WarnStore};
