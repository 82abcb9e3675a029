//! Order Repository
//!
//! Status transitions are conditional on the expected current status so a
//! guard violation (or a concurrent transition) fails atomically with no
//! partial mutation. `append_status` is the single mutation point for the
//! append-only history.

use super::{RepoError, RepoResult};
use shared::models::{Order, OrderItem, OrderStatus, OrderStatusEntry, PaymentStatus, ShippingAddress};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;
use sqlx::types::Json;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let row = sqlx::query_as::<_, Order>("SELECT * FROM customer_order WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<Order>> {
    let rows = sqlx::query_as::<_, Order>(
        "SELECT * FROM customer_order WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fields the lifecycle has already resolved before persisting
#[derive(Debug, Clone)]
pub struct OrderInsert {
    pub order_number: String,
    pub user_id: i64,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_transaction_id: Option<String>,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub discount_amount: i64,
}

/// Insert a PENDING order with its initial history entry, atomically.
/// `total_amount` is computed in the statement itself so the
/// subtotal + shipping - discount invariant holds at the persist point.
pub async fn insert(pool: &SqlitePool, data: OrderInsert, actor_id: i64) -> RepoResult<Order> {
    let id = snowflake_id();
    let now = now_millis();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO customer_order (id, order_number, user_id, items, shipping_address, \
         payment_method, payment_status, payment_transaction_id, subtotal, shipping_fee, \
         discount_amount, total_amount, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?9 + ?10 - ?11, 'PENDING', ?12, ?12)",
    )
    .bind(id)
    .bind(&data.order_number)
    .bind(data.user_id)
    .bind(Json(&data.items))
    .bind(Json(&data.shipping_address))
    .bind(&data.payment_method)
    .bind(if data.payment_transaction_id.is_some() {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Unpaid
    })
    .bind(&data.payment_transaction_id)
    .bind(data.subtotal)
    .bind(data.shipping_fee)
    .bind(data.discount_amount)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    append_status(
        &mut tx,
        id,
        OrderStatus::Pending,
        Some("Order created"),
        actor_id,
        None,
    )
    .await?;

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create order".into()))
}

/// Append one history entry. The only write path to
/// `order_status_history`; entries are never edited or removed.
pub async fn append_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    status: OrderStatus,
    note: Option<&str>,
    actor_id: i64,
    actor_name: Option<&str>,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO order_status_history (id, order_id, status, note, actor_id, actor_name, \
         created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(snowflake_id())
    .bind(order_id)
    .bind(status)
    .bind(note)
    .bind(actor_id)
    .bind(actor_name)
    .bind(now_millis())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Conditionally move an order from `from` to `to`, appending history in
/// the same transaction. Reaching DELIVERED for the first time stamps
/// `delivered_at`, starting the return-eligibility clock.
/// Returns false when the order was not in `from` — nothing is mutated.
pub async fn transition(
    pool: &SqlitePool,
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
    note: Option<&str>,
    actor_id: i64,
    actor_name: Option<&str>,
) -> RepoResult<bool> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "UPDATE customer_order SET status = ?3, updated_at = ?4, \
         delivered_at = CASE WHEN ?3 = 'DELIVERED' AND delivered_at IS NULL \
         THEN ?4 ELSE delivered_at END \
         WHERE id = ?1 AND status = ?2",
    )
    .bind(order_id)
    .bind(from)
    .bind(to)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if rows.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    append_status(&mut tx, order_id, to, note, actor_id, actor_name).await?;
    tx.commit().await?;
    Ok(true)
}

/// Record the payment status delivered by the gateway collaborator
pub async fn set_payment_status(
    pool: &SqlitePool,
    order_id: i64,
    status: PaymentStatus,
) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE customer_order SET payment_status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(order_id)
        .bind(status)
        .bind(now_millis())
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Status history, oldest first
pub async fn history(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderStatusEntry>> {
    let rows = sqlx::query_as::<_, OrderStatusEntry>(
        "SELECT * FROM order_status_history WHERE order_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
