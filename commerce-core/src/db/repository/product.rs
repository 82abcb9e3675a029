//! Product Repository
//!
//! The inventory collaborator's storage face. Stock moves only through
//! atomic signed deltas — never read-modify-write — so concurrent
//! checkouts cannot oversell a line.

use super::{RepoError, RepoResult};
use shared::models::{Product, ProductCreate};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let row = sqlx::query_as::<_, Product>("SELECT * FROM product WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    if data.price < 0 {
        return Err(RepoError::Validation("price must be non-negative".into()));
    }
    if data.stock < 0 {
        return Err(RepoError::Validation("stock must be non-negative".into()));
    }
    let id = snowflake_id();
    let now = now_millis();
    sqlx::query(
        "INSERT INTO product (id, name, category_id, price, stock, sold, is_active, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, 0, 1, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(data.category_id)
    .bind(data.price)
    .bind(data.stock)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

/// Atomically take `quantity` units of stock for a sale.
/// Returns false when stock is short — nothing is mutated.
pub async fn take_stock(pool: &SqlitePool, product_id: i64, quantity: i64) -> RepoResult<bool> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE product SET stock = stock - ?2, sold = sold + ?2, updated_at = ?3 \
         WHERE id = ?1 AND is_active = 1 AND stock >= ?2",
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Atomically return `quantity` units of stock (cancellation, return
/// receipt, or compensation after a partially-failed checkout)
pub async fn restore_stock(pool: &SqlitePool, product_id: i64, quantity: i64) -> RepoResult<bool> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE product SET stock = stock + ?2, sold = MAX(sold - ?2, 0), updated_at = ?3 \
         WHERE id = ?1",
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}
