//! Resilient query execution: one retry envelope around every storage
//! call.
//!
//! Every read and write issued by the stores goes through
//! [`with_retries`]; no store touches the pool outside it. The envelope
//! retries connectivity-class failures (dropped connections, pool
//! exhaustion, server-internal errors) with exponential backoff and
//! surfaces everything else immediately -- a constraint violation or a
//! malformed statement will fail the same way no matter how often it is
//! replayed.

use std::future::Future;
use std::time::Duration;

use crate::error::{is_transient, DbError};

/// Total attempts per operation, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles on each further retry.
const BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Execute `call`, retrying connectivity-class failures.
///
/// The closure is invoked up to [`MAX_ATTEMPTS`] times. After the n-th
/// failed attempt the executor sleeps `0.1 * 2^(n-1)` seconds (0.1s,
/// then 0.2s) before trying again. Non-connectivity failures surface
/// immediately without a retry; the final connectivity failure is
/// surfaced to the caller.
///
/// Multi-statement operations passed here must tolerate replay: the
/// stores rely on uniqueness constraints and upsert semantics so that a
/// transaction retried after an ambiguous connection loss cannot
/// double-apply its effects.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] immediately for non-connectivity
/// failures, or with the last error once attempts are exhausted.
pub async fn with_retries<T, F, Fut>(op: &str, call: F) -> Result<T, DbError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt: u32 = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if is_transient(&err) && attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    op,
                    attempt,
                    max_attempts = MAX_ATTEMPTS,
                    error = %err,
                    "database connection failed, retrying"
                );
                tokio::time::sleep(backoff_delay(attempt)).await;
                attempt = attempt.saturating_add(1);
            }
            Err(err) => {
                if is_transient(&err) {
                    tracing::error!(
                        op,
                        attempts = attempt,
                        error = %err,
                        "database connection failed, giving up"
                    );
                }
                return Err(DbError::Postgres(err));
            }
        }
    }
}

/// Delay before the retry that follows the given failed attempt
/// (1-based).
const fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
    BACKOFF_BASE.saturating_mul(factor)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(1), Duration::from_millis(100));
        assert_eq!(backoff_delay(2), Duration::from_millis(200));
        assert_eq!(backoff_delay(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn first_success_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result = with_retries("test_op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, sqlx::Error>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_to_exhaustion() {
        let calls = AtomicU32::new(0);
        let result: Result<(), DbError> = with_retries("test_op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(sqlx::Error::PoolTimedOut)
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), DbError> = with_retries("test_op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(sqlx::Error::RowNotFound)
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_then_success_recovers() {
        let calls = AtomicU32::new(0);
        let result = with_retries("test_op", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(sqlx::Error::PoolTimedOut)
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
