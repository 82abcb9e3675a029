//! Order Lifecycle
//!
//! Creation snapshots prices, takes stock line by line, and consumes any
//! voucher reservation; every stock decrement already applied is
//! compensated when a later step fails. Transitions run through one
//! conditional update so a guard violation mutates nothing.

use crate::db::repository::{order, product, voucher, voucher_usage, RepoError};
use crate::vouchers::discount::{self, Recalculation};
use crate::vouchers::ledger::{self, CommitData, LedgerError};
use shared::models::{
    Order, OrderCreate, OrderItem, OrderStatus, OrderStatusEntry, PaymentStatus, UsageStatus,
};
use shared::util::order_number;
use shared::ErrorCode;
use sqlx::SqlitePool;
use thiserror::Error;

/// Who is asking for a transition. Everything except cancelling a
/// pending order is staff-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Buyer,
    Staff,
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub id: i64,
    pub name: Option<String>,
    pub role: ActorRole,
}

impl Actor {
    pub fn buyer(id: i64) -> Self {
        Self {
            id,
            name: None,
            role: ActorRole::Buyer,
        }
    }

    pub fn staff(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            role: ActorRole::Staff,
        }
    }

    fn is_staff(&self) -> bool {
        self.role == ActorRole::Staff
    }
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order {0} not found")]
    NotFound(i64),
    #[error("{0}")]
    Validation(String),
    #[error("Product {0} is unavailable")]
    ProductUnavailable(i64),
    #[error("Insufficient stock for product {0}")]
    InsufficientStock(i64),
    #[error("Cannot transition from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order in status {0:?} cannot be cancelled")]
    NotCancellable(OrderStatus),
    #[error("Actor is not permitted to perform this transition")]
    PermissionDenied,
    #[error("Applied voucher is no longer valid: {0}")]
    VoucherInvalid(ErrorCode),
    #[error("Order was modified concurrently")]
    Conflict,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Storage(#[from] RepoError),
}

impl OrderError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            OrderError::NotFound(_) => ErrorCode::OrderNotFound,
            OrderError::Validation(_) => ErrorCode::ValidationFailed,
            OrderError::ProductUnavailable(_) => ErrorCode::NotFound,
            OrderError::InsufficientStock(_) => ErrorCode::InsufficientStock,
            OrderError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            OrderError::NotCancellable(_) => ErrorCode::NotCancellable,
            OrderError::PermissionDenied => ErrorCode::PermissionDenied,
            OrderError::VoucherInvalid(code) => *code,
            OrderError::Conflict => ErrorCode::ConcurrencyError,
            OrderError::Ledger(e) => e.error_code(),
            OrderError::Storage(_) => ErrorCode::DatabaseError,
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;

/// Which transitions the state machine admits. CANCELLED is reachable
/// only from PENDING, and RETURNED only through the return lifecycle.
fn allowed(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Processing)
            | (Pending, Shipping)
            | (Pending, Delivered)
            | (Pending, Cancelled)
            | (Confirmed, Processing)
            | (Confirmed, Shipping)
            | (Confirmed, Delivered)
            | (Processing, Shipping)
            | (Processing, Delivered)
            | (Shipping, Delivered)
    )
}

/// Create a PENDING order.
///
/// Prices come from the catalog at this moment and are frozen into the
/// line items. Stock is taken per line with an atomic guard; on any
/// failure the lines already taken are restored. A voucher reservation,
/// if present, is committed last — if that fails the order is cancelled
/// and stock returned, because capacity was lost to a sweep or rollback.
pub async fn create(pool: &SqlitePool, data: OrderCreate, actor: &Actor) -> OrderResult<Order> {
    if data.lines.is_empty() {
        return Err(OrderError::Validation("Order has no line items".into()));
    }
    for line in &data.lines {
        if line.quantity <= 0 {
            return Err(OrderError::Validation(format!(
                "Invalid quantity {} for product {}",
                line.quantity, line.product_id
            )));
        }
    }

    // Price snapshot
    let mut items = Vec::with_capacity(data.lines.len());
    for line in &data.lines {
        let Some(p) = product::find_by_id(pool, line.product_id).await? else {
            return Err(OrderError::ProductUnavailable(line.product_id));
        };
        if !p.is_active {
            return Err(OrderError::ProductUnavailable(line.product_id));
        }
        items.push(OrderItem {
            product_id: p.id,
            name: p.name,
            price: p.price,
            quantity: line.quantity,
            line_total: p.price * line.quantity,
        });
    }
    let subtotal: i64 = items.iter().map(|i| i.line_total).sum();

    // Resolve the applied voucher against the actual totals. The preview
    // was computed at cart stage; the cart may have changed since.
    let mut discount_amount = 0;
    let mut reservation = None;
    if let Some(usage_id) = data.voucher_usage_id {
        let Some(usage) = voucher_usage::find_by_id(pool, usage_id).await? else {
            return Err(OrderError::Ledger(LedgerError::UsageNotFound(usage_id)));
        };
        if usage.status.is_terminal() {
            return Err(OrderError::Ledger(LedgerError::AlreadyTerminal(usage_id)));
        }
        if usage.status != UsageStatus::Pending {
            return Err(OrderError::Ledger(LedgerError::AlreadyCommitted(usage_id)));
        }
        let v = voucher::find_by_id(pool, usage.voucher_id)
            .await?
            .ok_or(OrderError::Ledger(LedgerError::NotFound))?;
        match discount::recalculate(&v, subtotal, data.shipping_fee) {
            Recalculation::Valid(breakdown) => discount_amount = breakdown.discount_amount,
            Recalculation::Invalid { code } => return Err(OrderError::VoucherInvalid(code)),
        }
        reservation = Some(usage_id);
    }

    // Take stock line by line, compensating on failure
    let mut taken: Vec<&OrderItem> = Vec::new();
    for item in &items {
        if !product::take_stock(pool, item.product_id, item.quantity).await? {
            restore_lines(pool, &taken).await;
            return Err(OrderError::InsufficientStock(item.product_id));
        }
        taken.push(item);
    }

    let insert = order::OrderInsert {
        order_number: order_number(),
        user_id: data.user_id,
        items: items.clone(),
        shipping_address: data.shipping_address,
        payment_method: data.payment_method,
        payment_transaction_id: data.payment_transaction_id,
        subtotal,
        shipping_fee: data.shipping_fee,
        discount_amount,
    };
    let created = match order::insert(pool, insert, actor.id).await {
        Ok(o) => o,
        Err(e) => {
            restore_lines(pool, &taken).await;
            return Err(e.into());
        }
    };

    if let Some(usage_id) = reservation {
        let commit = CommitData {
            order_id: created.id,
            order_number: created.order_number.clone(),
            discount_amount,
            order_amount: subtotal,
            final_amount: created.total_amount,
        };
        if let Err(e) = ledger::commit(pool, usage_id, &commit).await {
            // Reservation was lost (swept or rolled back) after checkout
            // validated it; the order cannot keep its discount.
            restore_lines(pool, &taken).await;
            let cancelled = order::transition(
                pool,
                created.id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                Some("Voucher reservation was no longer available"),
                actor.id,
                actor.name.as_deref(),
            )
            .await;
            if let Err(cancel_err) = cancelled {
                tracing::error!(
                    order_id = created.id,
                    error = %cancel_err,
                    "Failed to cancel order after voucher commit failure"
                );
            }
            return Err(e.into());
        }
    }

    tracing::info!(
        order_id = created.id,
        order_number = %created.order_number,
        user_id = created.user_id,
        total = created.total_amount,
        "Order created"
    );
    Ok(created)
}

async fn restore_lines(pool: &SqlitePool, taken: &[&OrderItem]) {
    for item in taken {
        if let Err(e) = product::restore_stock(pool, item.product_id, item.quantity).await {
            tracing::error!(
                product_id = item.product_id,
                quantity = item.quantity,
                error = %e,
                "Failed to restore stock while compensating a failed order"
            );
        }
    }
}

/// Staff-driven forward transition. RETURNED is rejected here (only the
/// return lifecycle may set it), and so is CANCELLED — cancellation
/// goes through `cancel`, which also restores stock and releases any
/// voucher reservation.
pub async fn transition(
    pool: &SqlitePool,
    order_id: i64,
    to: OrderStatus,
    note: Option<&str>,
    actor: &Actor,
) -> OrderResult<Order> {
    if !actor.is_staff() {
        return Err(OrderError::PermissionDenied);
    }
    let current = order::find_by_id(pool, order_id)
        .await?
        .ok_or(OrderError::NotFound(order_id))?;

    if matches!(to, OrderStatus::Returned | OrderStatus::Cancelled) || !allowed(current.status, to)
    {
        return Err(OrderError::InvalidTransition {
            from: current.status,
            to,
        });
    }

    if !order::transition(
        pool,
        order_id,
        current.status,
        to,
        note,
        actor.id,
        actor.name.as_deref(),
    )
    .await?
    {
        // Someone moved the order between our read and the update
        return Err(OrderError::Conflict);
    }

    tracing::info!(order_id, from = ?current.status, to = ?to, "Order transitioned");
    order::find_by_id(pool, order_id)
        .await?
        .ok_or(OrderError::NotFound(order_id))
}

/// Cancel a PENDING order: conditional status flip first (the atomic
/// guard), then stock restoration and voucher rollback. A buyer may only
/// cancel their own order.
pub async fn cancel(pool: &SqlitePool, order_id: i64, actor: &Actor) -> OrderResult<Order> {
    let current = order::find_by_id(pool, order_id)
        .await?
        .ok_or(OrderError::NotFound(order_id))?;

    if !actor.is_staff() && actor.id != current.user_id {
        return Err(OrderError::PermissionDenied);
    }
    if current.status != OrderStatus::Pending {
        return Err(OrderError::NotCancellable(current.status));
    }

    if !order::transition(
        pool,
        order_id,
        OrderStatus::Pending,
        OrderStatus::Cancelled,
        Some("Order cancelled"),
        actor.id,
        actor.name.as_deref(),
    )
    .await?
    {
        // Raced with a confirm or another cancel; re-read to report why
        let now = order::find_by_id(pool, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        return Err(OrderError::NotCancellable(now.status));
    }

    for item in &current.items {
        product::restore_stock(pool, item.product_id, item.quantity).await?;
    }
    ledger::rollback_by_order(pool, order_id, UsageStatus::Cancelled).await?;

    tracing::info!(order_id, "Order cancelled");
    order::find_by_id(pool, order_id)
        .await?
        .ok_or(OrderError::NotFound(order_id))
}

/// Record the payment outcome delivered by the gateway collaborator
pub async fn record_payment(
    pool: &SqlitePool,
    order_id: i64,
    status: PaymentStatus,
) -> OrderResult<()> {
    if !order::set_payment_status(pool, order_id, status).await? {
        return Err(OrderError::NotFound(order_id));
    }
    Ok(())
}

pub async fn get(pool: &SqlitePool, order_id: i64) -> OrderResult<Order> {
    order::find_by_id(pool, order_id)
        .await?
        .ok_or(OrderError::NotFound(order_id))
}

pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> OrderResult<Vec<Order>> {
    Ok(order::find_by_user(pool, user_id).await?)
}

pub async fn history(pool: &SqlitePool, order_id: i64) -> OrderResult<Vec<OrderStatusEntry>> {
    Ok(order::history(pool, order_id).await?)
}
