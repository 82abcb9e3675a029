//! Voucher Repository
//!
//! Administration CRUD plus the two atomic capacity operations the ledger
//! is built on: `try_reserve` and `release`. Both are single conditional
//! UPDATEs — of N concurrent reservations against one remaining unit,
//! SQLite applies exactly one.

use super::{RepoError, RepoResult};
use shared::models::{Voucher, VoucherCreate, VoucherUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;
use sqlx::types::Json;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Voucher>> {
    let row = sqlx::query_as::<_, Voucher>("SELECT * FROM voucher WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<Voucher>> {
    let row = sqlx::query_as::<_, Voucher>("SELECT * FROM voucher WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// List active vouchers, highest priority first
pub async fn find_active(pool: &SqlitePool) -> RepoResult<Vec<Voucher>> {
    let rows = sqlx::query_as::<_, Voucher>(
        "SELECT * FROM voucher WHERE is_active = 1 ORDER BY priority DESC, created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, data: VoucherCreate) -> RepoResult<Voucher> {
    if find_by_code(pool, &data.code).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Voucher '{}' already exists",
            data.code
        )));
    }
    if data.usage_limit <= 0 {
        return Err(RepoError::Validation(
            "usage_limit must be positive".into(),
        ));
    }
    if data.valid_from > data.valid_to {
        return Err(RepoError::Validation(
            "valid_from must not be after valid_to".into(),
        ));
    }

    let id = snowflake_id();
    let now = now_millis();
    sqlx::query(
        "INSERT INTO voucher (id, code, name, voucher_type, value, min_order_amount, \
         max_discount_amount, usage_limit, used_count, valid_from, valid_to, per_user_limit, \
         first_use_only, new_user_only, min_cart_quantity, max_cart_quantity, is_stackable, \
         applicable_users, applicable_products, excluded_products, applicable_categories, \
         excluded_categories, priority, is_active, created_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.code)
    .bind(&data.name)
    .bind(data.voucher_type)
    .bind(data.value)
    .bind(data.min_order_amount.unwrap_or(0))
    .bind(data.max_discount_amount)
    .bind(data.usage_limit)
    .bind(data.valid_from)
    .bind(data.valid_to)
    .bind(data.per_user_limit.unwrap_or(1))
    .bind(data.first_use_only.unwrap_or(false))
    .bind(data.new_user_only.unwrap_or(false))
    .bind(data.min_cart_quantity)
    .bind(data.max_cart_quantity)
    .bind(data.is_stackable.unwrap_or(false))
    .bind(Json(data.applicable_users.unwrap_or_default()))
    .bind(Json(data.applicable_products.unwrap_or_default()))
    .bind(Json(data.excluded_products.unwrap_or_default()))
    .bind(Json(data.applicable_categories.unwrap_or_default()))
    .bind(Json(data.excluded_categories.unwrap_or_default()))
    .bind(data.priority.unwrap_or(0))
    .bind(data.created_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create voucher".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: VoucherUpdate) -> RepoResult<Voucher> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE voucher SET name = COALESCE(?1, name), value = COALESCE(?2, value), \
         min_order_amount = COALESCE(?3, min_order_amount), \
         max_discount_amount = COALESCE(?4, max_discount_amount), \
         usage_limit = COALESCE(?5, usage_limit), valid_from = COALESCE(?6, valid_from), \
         valid_to = COALESCE(?7, valid_to), per_user_limit = COALESCE(?8, per_user_limit), \
         priority = COALESCE(?9, priority), is_active = COALESCE(?10, is_active), \
         updated_at = ?11 WHERE id = ?12",
    )
    .bind(data.name)
    .bind(data.value)
    .bind(data.min_order_amount)
    .bind(data.max_discount_amount)
    .bind(data.usage_limit)
    .bind(data.valid_from)
    .bind(data.valid_to)
    .bind(data.per_user_limit)
    .bind(data.priority)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Voucher {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Voucher {id} not found")))
}

/// Soft delete — redemption paths only see active vouchers
pub async fn deactivate(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = now_millis();
    let rows = sqlx::query("UPDATE voucher SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Atomically reserve one unit of redemption capacity.
///
/// Increments `used_count` only while the voucher is active, inside its
/// validity window, and below its usage limit — one indivisible
/// statement. Returns false when the guard fails (capacity gone, window
/// closed, or voucher missing); the caller classifies why.
pub async fn try_reserve(pool: &SqlitePool, voucher_id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE voucher SET used_count = used_count + 1, updated_at = ?2 \
         WHERE id = ?1 AND is_active = 1 AND used_count < usage_limit \
         AND valid_from <= ?3 AND valid_to >= ?3",
    )
    .bind(voucher_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Return one unit of capacity to the pool. Guarded so `used_count`
/// never goes negative. Runs on a connection so the ledger can pair it
/// with the usage-record flip in one transaction.
pub async fn release(
    conn: &mut sqlx::SqliteConnection,
    voucher_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE voucher SET used_count = used_count - 1, updated_at = ?2 \
         WHERE id = ?1 AND used_count > 0",
    )
    .bind(voucher_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}
