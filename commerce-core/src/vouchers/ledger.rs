//! Voucher Ledger
//!
//! The redemption saga: `lock` reserves one unit of capacity race-free,
//! `commit` attaches the reservation to a concrete order, `rollback`
//! returns capacity to the pool. Reserving and applying are separate
//! operations so the fallible steps between them (stock, payment) never
//! sit inside a lock. A caller whose downstream step fails after a
//! successful lock must roll back itself; the abandoned sweep reclaims
//! what crashed callers leave behind.

use crate::db::repository::{voucher, voucher_usage, RepoError, RepoResult};
use shared::models::{UsageStatus, VoucherUsage};
use shared::util::now_millis;
use shared::ErrorCode;
use sqlx::SqlitePool;
use thiserror::Error;

pub use crate::db::repository::voucher_usage::CommitData;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Voucher not found")]
    NotFound,
    #[error("Voucher is inactive")]
    Inactive,
    #[error("Voucher is not yet valid")]
    NotStarted,
    #[error("Voucher has expired")]
    Expired,
    #[error("Voucher capacity exhausted")]
    OutOfStock,
    #[error("Usage record {0} not found")]
    UsageNotFound(i64),
    #[error("Usage record {0} was already committed")]
    AlreadyCommitted(i64),
    #[error("Usage record {0} is already terminal")]
    AlreadyTerminal(i64),
    #[error(transparent)]
    Storage(#[from] RepoError),
}

impl LedgerError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            LedgerError::NotFound | LedgerError::UsageNotFound(_) => ErrorCode::NotFound,
            LedgerError::Inactive => ErrorCode::Inactive,
            LedgerError::NotStarted => ErrorCode::NotStarted,
            LedgerError::Expired => ErrorCode::Expired,
            LedgerError::OutOfStock => ErrorCode::OutOfStock,
            LedgerError::AlreadyCommitted(_) => ErrorCode::AlreadyCommitted,
            LedgerError::AlreadyTerminal(_) => ErrorCode::AlreadyTerminal,
            LedgerError::Storage(RepoError::NotFound(_)) => ErrorCode::NotFound,
            LedgerError::Storage(_) => ErrorCode::DatabaseError,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Reserve one unit of capacity and open a PENDING usage record.
///
/// The reservation is a single conditional `UPDATE`; of N concurrent
/// calls against one remaining unit, exactly one sees a row affected.
/// A failed reservation has no side effects — the voucher is re-read
/// only to say why it failed.
pub async fn lock(
    pool: &SqlitePool,
    voucher_id: i64,
    user_id: i64,
    pending_ref: Option<&str>,
) -> LedgerResult<i64> {
    let now = now_millis();
    if !voucher::try_reserve(pool, voucher_id, now).await? {
        return Err(classify_reserve_failure(pool, voucher_id, now).await?);
    }

    let usage = match voucher_usage::insert_pending(pool, voucher_id, user_id, pending_ref).await {
        Ok(usage) => usage,
        Err(e) => {
            // Reservation must not leak if the record insert fails
            let mut conn = pool.acquire().await.map_err(RepoError::from)?;
            voucher::release(&mut conn, voucher_id, now_millis()).await?;
            return Err(e.into());
        }
    };

    tracing::info!(
        voucher_id,
        user_id,
        usage_id = usage.id,
        pending_ref,
        "Voucher capacity locked"
    );
    Ok(usage.id)
}

/// Why did the conditional reserve touch zero rows?
async fn classify_reserve_failure(
    pool: &SqlitePool,
    voucher_id: i64,
    now: i64,
) -> RepoResult<LedgerError> {
    let Some(v) = voucher::find_by_id(pool, voucher_id).await? else {
        return Ok(LedgerError::NotFound);
    };
    if !v.is_active {
        return Ok(LedgerError::Inactive);
    }
    if now < v.valid_from {
        return Ok(LedgerError::NotStarted);
    }
    if now > v.valid_to {
        return Ok(LedgerError::Expired);
    }
    Ok(LedgerError::OutOfStock)
}

/// Flip a PENDING reservation to USED and attach the order.
/// Capacity was already taken at lock time; this only settles the record.
/// A second commit for the same id fails with `AlreadyCommitted`.
pub async fn commit(pool: &SqlitePool, usage_id: i64, data: &CommitData) -> LedgerResult<()> {
    if voucher_usage::commit_pending(pool, usage_id, data).await? {
        tracing::info!(usage_id, order_id = data.order_id, "Voucher usage committed");
        return Ok(());
    }
    match voucher_usage::find_by_id(pool, usage_id).await? {
        None => Err(LedgerError::UsageNotFound(usage_id)),
        Some(_) => Err(LedgerError::AlreadyCommitted(usage_id)),
    }
}

/// Return a reservation's capacity to the pool.
///
/// One transaction pairs the terminal flip with the `used_count`
/// decrement, so a crash between them cannot strand capacity. An
/// already-terminal record fails with `AlreadyTerminal` — a double
/// rollback is a bug to surface, not a success to absorb.
pub async fn rollback(pool: &SqlitePool, usage_id: i64, target: UsageStatus) -> LedgerResult<()> {
    debug_assert!(target.is_terminal());
    let Some(usage) = voucher_usage::find_by_id(pool, usage_id).await? else {
        return Err(LedgerError::UsageNotFound(usage_id));
    };

    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    if !voucher_usage::mark_terminal(&mut *tx, usage_id, target).await? {
        tx.rollback().await.map_err(RepoError::from)?;
        return Err(LedgerError::AlreadyTerminal(usage_id));
    }
    voucher::release(&mut *tx, usage.voucher_id, now_millis()).await?;
    tx.commit().await.map_err(RepoError::from)?;

    tracing::info!(
        usage_id,
        voucher_id = usage.voucher_id,
        status = ?target,
        "Voucher usage rolled back"
    );
    Ok(())
}

/// Roll back every non-terminal usage referencing an order. Used on
/// order cancellation (CANCELLED) and return completion (REFUNDED).
/// Returns how many records were rolled back.
pub async fn rollback_by_order(
    pool: &SqlitePool,
    order_id: i64,
    target: UsageStatus,
) -> LedgerResult<usize> {
    let records = voucher_usage::find_non_terminal_by_order(pool, order_id).await?;
    let mut rolled_back = 0;
    for record in &records {
        match rollback(pool, record.id, target).await {
            Ok(()) => rolled_back += 1,
            // Lost a race with another roll-back path; the capacity is
            // already back in the pool.
            Err(LedgerError::AlreadyTerminal(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(rolled_back)
}

/// Sweep PENDING reservations older than `max_age_minutes`, reclaiming
/// capacity abandoned by checkouts that never committed or rolled back.
pub async fn cleanup_abandoned(pool: &SqlitePool, max_age_minutes: i64) -> LedgerResult<usize> {
    let cutoff = now_millis() - max_age_minutes * 60_000;
    let stale = voucher_usage::find_stale_pending(pool, cutoff).await?;
    let mut reclaimed = 0;
    for record in &stale {
        match rollback(pool, record.id, UsageStatus::Cancelled).await {
            Ok(()) => reclaimed += 1,
            Err(LedgerError::AlreadyTerminal(_)) => {}
            Err(e) => return Err(e),
        }
    }
    if reclaimed > 0 {
        tracing::info!(reclaimed, max_age_minutes, "Reclaimed abandoned voucher reservations");
    }
    Ok(reclaimed)
}

/// Usage audit trail for a voucher
pub async fn usage_history(pool: &SqlitePool, voucher_id: i64) -> LedgerResult<Vec<VoucherUsage>> {
    Ok(voucher_usage::find_by_voucher(pool, voucher_id).await?)
}

/// Usage audit trail for a user
pub async fn user_history(pool: &SqlitePool, user_id: i64) -> LedgerResult<Vec<VoucherUsage>> {
    Ok(voucher_usage::find_by_user(pool, user_id).await?)
}
