//! Voucher Usage Repository
//!
//! Usage rows are the audit-and-lock unit of the ledger. Status flips are
//! conditional on the current status so double commits and double
//! rollbacks surface as zero-row updates instead of silent overwrites.

use super::{RepoError, RepoResult};
use shared::models::{UsageStatus, VoucherUsage};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<VoucherUsage>> {
    let row = sqlx::query_as::<_, VoucherUsage>("SELECT * FROM voucher_usage WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Insert a PENDING reservation created by a successful capacity lock
pub async fn insert_pending(
    pool: &SqlitePool,
    voucher_id: i64,
    user_id: i64,
    pending_ref: Option<&str>,
) -> RepoResult<VoucherUsage> {
    let id = snowflake_id();
    let now = now_millis();
    sqlx::query(
        "INSERT INTO voucher_usage (id, voucher_id, user_id, pending_ref, status, \
         discount_amount, order_amount, final_amount, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'PENDING', 0, 0, 0, ?, ?)",
    )
    .bind(id)
    .bind(voucher_id)
    .bind(user_id)
    .bind(pending_ref)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create usage record".into()))
}

/// Amounts attached when a reservation is committed to an order
#[derive(Debug, Clone)]
pub struct CommitData {
    pub order_id: i64,
    pub order_number: String,
    pub discount_amount: i64,
    pub order_amount: i64,
    pub final_amount: i64,
}

/// Conditionally flip PENDING → USED and attach order data.
/// Returns false if the record was not PENDING (double commit, or
/// already swept).
pub async fn commit_pending(pool: &SqlitePool, id: i64, data: &CommitData) -> RepoResult<bool> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE voucher_usage SET status = 'USED', order_id = ?2, order_number = ?3, \
         discount_amount = ?4, order_amount = ?5, final_amount = ?6, updated_at = ?7 \
         WHERE id = ?1 AND status = 'PENDING'",
    )
    .bind(id)
    .bind(data.order_id)
    .bind(&data.order_number)
    .bind(data.discount_amount)
    .bind(data.order_amount)
    .bind(data.final_amount)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Conditionally flip a non-terminal record (PENDING or USED) to a
/// terminal status. Zero rows affected means the record was already
/// terminal — the caller reports that as a failed no-op rather than
/// masking a double rollback. Runs on a connection so the ledger can
/// pair it with the capacity release in one transaction.
pub async fn mark_terminal(
    conn: &mut sqlx::SqliteConnection,
    id: i64,
    status: UsageStatus,
) -> RepoResult<bool> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE voucher_usage SET status = ?2, updated_at = ?3 \
         WHERE id = ?1 AND status IN ('PENDING', 'USED')",
    )
    .bind(id)
    .bind(status)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// All non-terminal records referencing an order
pub async fn find_non_terminal_by_order(
    pool: &SqlitePool,
    order_id: i64,
) -> RepoResult<Vec<VoucherUsage>> {
    let rows = sqlx::query_as::<_, VoucherUsage>(
        "SELECT * FROM voucher_usage WHERE order_id = ? AND status IN ('PENDING', 'USED')",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Count of a user's records holding capacity against a voucher.
/// PENDING rows count too — a reservation blocks the per-user cap until
/// it is committed, rolled back, or swept.
pub async fn count_active_for_user(
    pool: &SqlitePool,
    voucher_id: i64,
    user_id: i64,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM voucher_usage \
         WHERE voucher_id = ? AND user_id = ? AND status IN ('PENDING', 'USED')",
    )
    .bind(voucher_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Whether the user has any historical USED record for this voucher
pub async fn has_used(pool: &SqlitePool, voucher_id: i64, user_id: i64) -> RepoResult<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM voucher_usage \
         WHERE voucher_id = ? AND user_id = ? AND status = 'USED'",
    )
    .bind(voucher_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Find a user's live reservation for a checkout correlation ref
pub async fn find_pending_by_ref(
    pool: &SqlitePool,
    voucher_id: i64,
    user_id: i64,
    pending_ref: &str,
) -> RepoResult<Option<VoucherUsage>> {
    let row = sqlx::query_as::<_, VoucherUsage>(
        "SELECT * FROM voucher_usage WHERE voucher_id = ? AND user_id = ? \
         AND pending_ref = ? AND status = 'PENDING' LIMIT 1",
    )
    .bind(voucher_id)
    .bind(user_id)
    .bind(pending_ref)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// PENDING reservations created before the cutoff (abandoned checkouts)
pub async fn find_stale_pending(
    pool: &SqlitePool,
    cutoff_millis: i64,
) -> RepoResult<Vec<VoucherUsage>> {
    let rows = sqlx::query_as::<_, VoucherUsage>(
        "SELECT * FROM voucher_usage WHERE status = 'PENDING' AND created_at < ? \
         ORDER BY created_at ASC",
    )
    .bind(cutoff_millis)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Usage audit trail for a voucher, newest first
pub async fn find_by_voucher(pool: &SqlitePool, voucher_id: i64) -> RepoResult<Vec<VoucherUsage>> {
    let rows = sqlx::query_as::<_, VoucherUsage>(
        "SELECT * FROM voucher_usage WHERE voucher_id = ? ORDER BY created_at DESC",
    )
    .bind(voucher_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Usage audit trail for a user across all vouchers, newest first
pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<VoucherUsage>> {
    let rows = sqlx::query_as::<_, VoucherUsage>(
        "SELECT * FROM voucher_usage WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
