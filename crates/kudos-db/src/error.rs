//! Error types and failure classification for the storage layer.
//!
//! Failures fall into four classes with different handling:
//! connectivity (retried by the executor, then surfaced), integrity
//! (constraint violations -- expected contention signals, converted by
//! the stores into negative outcomes), validation (rejected before any
//! connection is touched), and best-effort paths that degrade to
//! empty/zero results at their own boundary.

use kudos_core::DomainError;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Caller-supplied values failed domain validation.
    #[error("validation error: {0}")]
    Validation(#[from] DomainError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether this is a connectivity-class failure the executor would
    /// have retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Postgres(err) => is_transient(err),
            Self::Migration(_) | Self::Validation(_) | Self::Config(_) => false,
        }
    }
}

/// Connectivity-class failures: the storage link failed rather than the
/// statement. These are the only errors the executor retries.
pub(crate) fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| {
            // SQLSTATE class 08: connection exception; class 57:
            // operator intervention (admin shutdown, crash); class XX:
            // server-internal error.
            code.starts_with("08") || code.starts_with("57") || code.starts_with("XX")
        }),
        _ => false,
    }
}

/// Whether the statement failed on a uniqueness constraint.
///
/// Under concurrent reward issuance this is the expected signal that
/// another caller already won; it is never retried.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.kind() == sqlx::error::ErrorKind::UniqueViolation)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhaustion_is_transient() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::PoolClosed));
    }

    #[test]
    fn io_failures_are_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(is_transient(&sqlx::Error::Io(io)));
    }

    #[test]
    fn statement_failures_are_not_transient() {
        assert!(!is_transient(&sqlx::Error::RowNotFound));
        assert!(!is_transient(&sqlx::Error::ColumnNotFound("points".into())));
    }

    #[test]
    fn validation_errors_are_not_transient() {
        let err = DbError::Validation(DomainError::DeltaOutOfRange { delta: 50_000 });
        assert!(!err.is_transient());
    }
}
