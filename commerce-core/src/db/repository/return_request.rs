//! Return Request Repository

use super::{RepoError, RepoResult};
use shared::models::{RefundBreakdown, RefundStatus, ReturnLine, ReturnReason, ReturnRequest, ReturnStatus};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;
use sqlx::types::Json;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<ReturnRequest>> {
    let row = sqlx::query_as::<_, ReturnRequest>("SELECT * FROM return_request WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<ReturnRequest>> {
    let rows = sqlx::query_as::<_, ReturnRequest>(
        "SELECT * FROM return_request WHERE order_id = ? ORDER BY created_at DESC",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns that still hold the one-open-return-per-order slot
pub async fn find_open_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Option<ReturnRequest>> {
    let row = sqlx::query_as::<_, ReturnRequest>(
        "SELECT * FROM return_request WHERE order_id = ? \
         AND status NOT IN ('REJECTED', 'COMPLETED', 'CANCELLED') LIMIT 1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[derive(Debug, Clone)]
pub struct ReturnInsert {
    pub order_id: i64,
    pub order_number: String,
    pub user_id: i64,
    pub lines: Vec<ReturnLine>,
    pub reason: ReturnReason,
    pub description: Option<String>,
    pub refund: RefundBreakdown,
}

pub async fn insert(pool: &SqlitePool, data: ReturnInsert) -> RepoResult<ReturnRequest> {
    let id = snowflake_id();
    let now = now_millis();

    sqlx::query(
        "INSERT INTO return_request (id, order_id, order_number, user_id, lines, reason, \
         description, refund, refund_amount, status, refund_status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'PENDING', 'PENDING', ?, ?)",
    )
    .bind(id)
    .bind(data.order_id)
    .bind(&data.order_number)
    .bind(data.user_id)
    .bind(Json(&data.lines))
    .bind(data.reason)
    .bind(&data.description)
    .bind(Json(&data.refund))
    .bind(data.refund.total_refund)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Duplicate(format!(
            "Order {} already has an open return request",
            data.order_id
        )),
        _ => RepoError::from(e),
    })?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create return request".into()))
}

/// Conditionally move a return from `from` to `to`.
/// Returns false when the row was not in `from`.
pub async fn transition(
    pool: &SqlitePool,
    id: i64,
    from: ReturnStatus,
    to: ReturnStatus,
    resolution_note: Option<&str>,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE return_request SET status = ?3, updated_at = ?4, \
         resolution_note = COALESCE(?5, resolution_note) \
         WHERE id = ?1 AND status = ?2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(now_millis())
    .bind(resolution_note)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn set_refund_status(
    pool: &SqlitePool,
    id: i64,
    status: RefundStatus,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE return_request SET refund_status = ?2, updated_at = ?3 WHERE id = ?1",
    )
    .bind(id)
    .bind(status)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}
