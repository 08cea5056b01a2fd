//! Administrative audit trail.
//!
//! Every administrative point mutation is appended here with the
//! operator, target, and before/after balances. This is an
//! observability path, not a correctness path: a logging fault must
//! never block the reward operation it describes, so writes and reads
//! degrade locally instead of propagating failures.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kudos_types::{AdminOperation, ServerId, UserId};

use crate::error::DbError;
use crate::executor::with_retries;

/// Parameters for one administrative point mutation record.
///
/// Packs the many columns of an audit row into a single struct to keep
/// call sites readable.
#[derive(Debug, Clone, Copy)]
pub struct AdminLogParams<'a> {
    /// The kind of mutation performed.
    pub operation: AdminOperation,
    /// The operator who performed it.
    pub operator: UserId,
    /// Operator display name at the time of the operation.
    pub operator_username: &'a str,
    /// The member whose balance was mutated.
    pub target: UserId,
    /// Target display name at the time of the operation.
    pub target_username: &'a str,
    /// The tenant the mutation applied to.
    pub server: ServerId,
    /// Signed point change applied.
    pub points_change: i64,
    /// Balance before the mutation.
    pub points_before: i64,
    /// Balance after the mutation.
    pub points_after: i64,
    /// Operator-supplied reason.
    pub reason: &'a str,
}

/// A row from the `admin_audit_logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminAuditRow {
    /// The kind of mutation, as stored.
    pub operation_type: String,
    /// Operator display name at the time of the operation.
    pub operator_username: String,
    /// Target display name at the time of the operation.
    pub target_username: String,
    /// Signed point change applied.
    pub points_change: i64,
    /// Balance before the mutation.
    pub points_before: i64,
    /// Balance after the mutation.
    pub points_after: i64,
    /// Operator-supplied reason.
    pub reason: String,
    /// When the mutation was recorded.
    pub operation_time: DateTime<Utc>,
}

/// Operations on the `admin_audit_logs` table.
pub struct AuditStore<'a> {
    pool: &'a PgPool,
}

impl<'a> AuditStore<'a> {
    /// Create a new audit store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append one administrative mutation record.
    ///
    /// Best-effort: failures are logged locally and reported as
    /// `false` so the mutation being audited is never blocked.
    pub async fn log_admin_operation(&self, params: AdminLogParams<'_>) -> bool {
        let pool = self.pool;
        let result = with_retries("log_admin_operation", || async move {
            sqlx::query(
                r"INSERT INTO admin_audit_logs
                      (operation_type, operator_user_id, operator_username,
                       target_user_id, target_username, server_id,
                       points_change, points_before, points_after, reason)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(params.operation.as_db())
            .bind(params.operator.into_inner())
            .bind(params.operator_username)
            .bind(params.target.into_inner())
            .bind(params.target_username)
            .bind(params.server.into_inner())
            .bind(params.points_change)
            .bind(params.points_before)
            .bind(params.points_after)
            .bind(params.reason)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    operator = %params.operator,
                    target = %params.target,
                    server = %params.server,
                    error = %err,
                    "failed to write admin audit log"
                );
                false
            }
        }
    }

    /// Recent audit records for a tenant, newest first, optionally
    /// filtered by operator and/or target.
    ///
    /// Best-effort: failures are logged and degrade to an empty list.
    pub async fn admin_audit_logs(
        &self,
        server: ServerId,
        limit: i64,
        operator: Option<UserId>,
        target: Option<UserId>,
    ) -> Vec<AdminAuditRow> {
        let result = self.query_audit_logs(server, limit, operator, target).await;
        match result {
            Ok(rows) => rows,
            Err(err) => {
                tracing::error!(
                    %server,
                    error = %err,
                    "failed to read admin audit logs, returning empty"
                );
                Vec::new()
            }
        }
    }

    /// The four filter combinations select among four query shapes.
    async fn query_audit_logs(
        &self,
        server: ServerId,
        limit: i64,
        operator: Option<UserId>,
        target: Option<UserId>,
    ) -> Result<Vec<AdminAuditRow>, DbError> {
        let pool = self.pool;
        match (operator, target) {
            (Some(operator), Some(target)) => {
                with_retries("admin_audit_logs", || async move {
                    sqlx::query_as::<_, AdminAuditRow>(
                        r"SELECT operation_type, operator_username, target_username,
                                 points_change, points_before, points_after,
                                 reason, operation_time
                          FROM admin_audit_logs
                          WHERE server_id = $1 AND operator_user_id = $2
                            AND target_user_id = $3
                          ORDER BY operation_time DESC
                          LIMIT $4",
                    )
                    .bind(server.into_inner())
                    .bind(operator.into_inner())
                    .bind(target.into_inner())
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                })
                .await
            }
            (Some(operator), None) => {
                with_retries("admin_audit_logs", || async move {
                    sqlx::query_as::<_, AdminAuditRow>(
                        r"SELECT operation_type, operator_username, target_username,
                                 points_change, points_before, points_after,
                                 reason, operation_time
                          FROM admin_audit_logs
                          WHERE server_id = $1 AND operator_user_id = $2
                          ORDER BY operation_time DESC
                          LIMIT $3",
                    )
                    .bind(server.into_inner())
                    .bind(operator.into_inner())
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                })
                .await
            }
            (None, Some(target)) => {
                with_retries("admin_audit_logs", || async move {
                    sqlx::query_as::<_, AdminAuditRow>(
                        r"SELECT operation_type, operator_username, target_username,
                                 points_change, points_before, points_after,
                                 reason, operation_time
                          FROM admin_audit_logs
                          WHERE server_id = $1 AND target_user_id = $2
                          ORDER BY operation_time DESC
                          LIMIT $3",
                    )
                    .bind(server.into_inner())
                    .bind(target.into_inner())
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                })
                .await
            }
            (None, None) => {
                with_retries("admin_audit_logs", || async move {
                    sqlx::query_as::<_, AdminAuditRow>(
                        r"SELECT operation_type, operator_username, target_username,
                                 points_change, points_before, points_after,
                                 reason, operation_time
                          FROM admin_audit_logs
                          WHERE server_id = $1
                          ORDER BY operation_time DESC
                          LIMIT $2",
                    )
                    .bind(server.into_inner())
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                })
                .await
            }
        }
    }
}
