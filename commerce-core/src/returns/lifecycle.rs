//! Return Lifecycle
//!
//! Post-delivery return state machine. A request enters through a guard
//! (order delivered, inside the return window, no other open return,
//! quantities within what was bought), freezes its refund breakdown, and
//! then moves PENDING → APPROVED → PROCESSING → COMPLETED, with REJECTED
//! and CANCELLED as PENDING-stage exits.

use crate::db::repository::{order, product, return_request, RepoError};
use crate::orders::lifecycle::Actor;
use crate::returns::refund::{self, RefundPolicy};
use crate::vouchers::ledger::{self, LedgerError};
use shared::models::{
    OrderStatus, PaymentStatus, RefundStatus, ReturnLine, ReturnRequest, ReturnRequestCreate,
    ReturnStatus, UsageStatus,
};
use shared::util::now_millis;
use shared::ErrorCode;
use sqlx::SqlitePool;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReturnError {
    #[error("Order {0} not found")]
    OrderNotFound(i64),
    #[error("Only delivered orders can be returned")]
    OrderNotDelivered,
    #[error("The return window has closed")]
    WindowExpired,
    #[error("The order already has an open return request")]
    AlreadyOpen,
    #[error("Return quantity for product {0} exceeds the purchased quantity")]
    QuantityExceeded(i64),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Return request {0} not found")]
    NotFound(i64),
    #[error("Cannot transition return from {from:?} to {to:?}")]
    InvalidTransition { from: ReturnStatus, to: ReturnStatus },
    #[error("Actor is not permitted to perform this transition")]
    PermissionDenied,
    #[error("Return request was modified concurrently")]
    Conflict,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Storage(#[from] RepoError),
}

impl ReturnError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ReturnError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            ReturnError::OrderNotDelivered => ErrorCode::OrderNotDelivered,
            ReturnError::WindowExpired => ErrorCode::ReturnWindowExpired,
            ReturnError::AlreadyOpen => ErrorCode::ReturnAlreadyOpen,
            ReturnError::QuantityExceeded(_) => ErrorCode::ReturnQuantityExceeded,
            ReturnError::Validation(_) => ErrorCode::ValidationFailed,
            ReturnError::NotFound(_) => ErrorCode::NotFound,
            ReturnError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            ReturnError::PermissionDenied => ErrorCode::PermissionDenied,
            ReturnError::Conflict => ErrorCode::ConcurrencyError,
            ReturnError::Ledger(e) => e.error_code(),
            ReturnError::Storage(_) => ErrorCode::DatabaseError,
        }
    }
}

pub type ReturnResult<T> = Result<T, ReturnError>;

/// Open a return request for a delivered order.
///
/// The breakdown is computed once here and frozen into the request.
pub async fn create(
    pool: &SqlitePool,
    policy: &RefundPolicy,
    return_window_days: i64,
    data: ReturnRequestCreate,
) -> ReturnResult<ReturnRequest> {
    if data.lines.is_empty() {
        return Err(ReturnError::Validation("Return has no line items".into()));
    }
    let o = order::find_by_id(pool, data.order_id)
        .await?
        .ok_or(ReturnError::OrderNotFound(data.order_id))?;
    if o.user_id != data.user_id {
        return Err(ReturnError::PermissionDenied);
    }
    let Some(delivered_at) = o.delivered_at.filter(|_| o.status == OrderStatus::Delivered) else {
        return Err(ReturnError::OrderNotDelivered);
    };
    if now_millis() - delivered_at > return_window_days * 86_400_000 {
        return Err(ReturnError::WindowExpired);
    }
    if return_request::find_open_by_order(pool, o.id).await?.is_some() {
        return Err(ReturnError::AlreadyOpen);
    }

    // Snapshot names and unit prices from the order lines. Quantities
    // are summed per product, so a request split across several lines
    // for the same product is still capped at what was bought.
    let mut requested: HashMap<i64, i64> = HashMap::new();
    let mut lines = Vec::with_capacity(data.lines.len());
    for input in &data.lines {
        let Some(item) = o.item(input.product_id) else {
            return Err(ReturnError::QuantityExceeded(input.product_id));
        };
        if input.quantity <= 0 {
            return Err(ReturnError::QuantityExceeded(input.product_id));
        }
        let total = requested.entry(input.product_id).or_insert(0);
        *total += input.quantity;
        if *total > item.quantity {
            return Err(ReturnError::QuantityExceeded(input.product_id));
        }
        lines.push(ReturnLine {
            product_id: item.product_id,
            name: item.name.clone(),
            quantity: input.quantity,
            unit_price: item.price,
            reason: input.reason,
        });
    }

    let breakdown = refund::compute(policy, &o, &lines);
    // The unique open-return index closes the gap between the read
    // above and this insert when two requests race.
    let created = match return_request::insert(
        pool,
        return_request::ReturnInsert {
            order_id: o.id,
            order_number: o.order_number.clone(),
            user_id: data.user_id,
            lines,
            reason: data.reason,
            description: data.description,
            refund: breakdown,
        },
    )
    .await
    {
        Ok(r) => r,
        Err(RepoError::Duplicate(_)) => return Err(ReturnError::AlreadyOpen),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        return_id = created.id,
        order_id = o.id,
        refund = created.refund_amount,
        "Return request opened"
    );
    Ok(created)
}

/// Staff approves a pending request
pub async fn approve(
    pool: &SqlitePool,
    id: i64,
    note: Option<&str>,
    actor: &Actor,
) -> ReturnResult<ReturnRequest> {
    staff_transition(pool, id, ReturnStatus::Pending, ReturnStatus::Approved, note, actor).await
}

/// Staff rejects a pending request; the order keeps its state
pub async fn reject(
    pool: &SqlitePool,
    id: i64,
    note: Option<&str>,
    actor: &Actor,
) -> ReturnResult<ReturnRequest> {
    staff_transition(pool, id, ReturnStatus::Pending, ReturnStatus::Rejected, note, actor).await
}

/// Buyer withdraws their own request while it is still pending
pub async fn cancel(pool: &SqlitePool, id: i64, actor: &Actor) -> ReturnResult<ReturnRequest> {
    let current = get(pool, id).await?;
    if actor.id != current.user_id {
        return Err(ReturnError::PermissionDenied);
    }
    if current.status != ReturnStatus::Pending {
        return Err(ReturnError::InvalidTransition {
            from: current.status,
            to: ReturnStatus::Cancelled,
        });
    }
    if !return_request::transition(pool, id, ReturnStatus::Pending, ReturnStatus::Cancelled, None)
        .await?
    {
        return Err(ReturnError::Conflict);
    }
    get(pool, id).await
}

/// Staff confirms physical receipt of the goods: the request moves to
/// PROCESSING, stock is restored for the returned lines, and the order
/// flips to RETURNED.
pub async fn start_processing(
    pool: &SqlitePool,
    id: i64,
    actor: &Actor,
) -> ReturnResult<ReturnRequest> {
    let updated =
        staff_transition(pool, id, ReturnStatus::Approved, ReturnStatus::Processing, None, actor)
            .await?;

    for line in &updated.lines {
        product::restore_stock(pool, line.product_id, line.quantity).await?;
    }

    if !order::transition(
        pool,
        updated.order_id,
        OrderStatus::Delivered,
        OrderStatus::Returned,
        Some("Return received"),
        actor.id,
        actor.name.as_deref(),
    )
    .await?
    {
        // Only reachable if the order left DELIVERED through some other
        // path; the return still proceeds.
        tracing::warn!(
            order_id = updated.order_id,
            return_id = id,
            "Order was not in DELIVERED when the return was received"
        );
    }

    Ok(updated)
}

/// Staff finalizes the refund: the request completes, the order's
/// payment is marked refunded, and any voucher capacity the order held
/// returns to the pool.
pub async fn complete(pool: &SqlitePool, id: i64, actor: &Actor) -> ReturnResult<ReturnRequest> {
    let updated =
        staff_transition(pool, id, ReturnStatus::Processing, ReturnStatus::Completed, None, actor)
            .await?;

    return_request::set_refund_status(pool, id, RefundStatus::Refunded).await?;
    order::set_payment_status(pool, updated.order_id, PaymentStatus::Refunded).await?;
    ledger::rollback_by_order(pool, updated.order_id, UsageStatus::Refunded).await?;

    tracing::info!(
        return_id = id,
        order_id = updated.order_id,
        refund = updated.refund_amount,
        "Return completed and refunded"
    );
    get(pool, id).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> ReturnResult<ReturnRequest> {
    return_request::find_by_id(pool, id)
        .await?
        .ok_or(ReturnError::NotFound(id))
}

pub async fn list_for_order(pool: &SqlitePool, order_id: i64) -> ReturnResult<Vec<ReturnRequest>> {
    Ok(return_request::find_by_order(pool, order_id).await?)
}

async fn staff_transition(
    pool: &SqlitePool,
    id: i64,
    from: ReturnStatus,
    to: ReturnStatus,
    note: Option<&str>,
    actor: &Actor,
) -> ReturnResult<ReturnRequest> {
    if actor.role != crate::orders::lifecycle::ActorRole::Staff {
        return Err(ReturnError::PermissionDenied);
    }
    let current = get(pool, id).await?;
    if current.status != from {
        return Err(ReturnError::InvalidTransition {
            from: current.status,
            to,
        });
    }
    if !return_request::transition(pool, id, from, to, note).await? {
        return Err(ReturnError::Conflict);
    }
    tracing::info!(return_id = id, from = ?from, to = ?to, "Return transitioned");
    get(pool, id).await
}
