use super::lifecycle::{self, ReturnError};
use super::refund::{self, RefundPolicy};
use crate::db::repository::{order, product, return_request, voucher, voucher_usage, RepoError};
use crate::db::testing::temp_db;
use crate::orders::lifecycle::{self as orders, Actor};
use crate::vouchers::ledger;
use shared::models::{
    OrderCreate, OrderLineInput, OrderStatus, PaymentStatus, ProductCreate, RefundStatus,
    ReturnLine, ReturnLineInput, ReturnReason, ReturnRequestCreate, ReturnStatus, ShippingAddress,
    UsageStatus, VoucherCreate, VoucherType,
};
use shared::util::now_millis;
use sqlx::SqlitePool;

const WINDOW_DAYS: i64 = 7;

fn staff() -> Actor {
    Actor::staff(900, "support")
}

async fn delivered_order(pool: &SqlitePool, user_id: i64, with_voucher: bool) -> (i64, i64, Option<i64>) {
    let product_id = product::create(
        pool,
        ProductCreate {
            name: "Widget".into(),
            category_id: 5,
            price: 500_000,
            stock: 10,
        },
    )
    .await
    .unwrap()
    .id;

    let mut usage_id = None;
    if with_voucher {
        let now = now_millis();
        let v = voucher::create(
            pool,
            VoucherCreate {
                code: "SAVE".into(),
                name: "Save".into(),
                voucher_type: VoucherType::FixedAmount,
                value: 100_000,
                min_order_amount: None,
                max_discount_amount: None,
                usage_limit: 10,
                valid_from: now - 1000,
                valid_to: now + 86_400_000,
                per_user_limit: None,
                first_use_only: None,
                new_user_only: None,
                min_cart_quantity: None,
                max_cart_quantity: None,
                is_stackable: None,
                applicable_users: None,
                applicable_products: None,
                excluded_products: None,
                applicable_categories: None,
                excluded_categories: None,
                priority: None,
                created_by: None,
            },
        )
        .await
        .unwrap();
        usage_id = Some(ledger::lock(pool, v.id, user_id, None).await.unwrap());
    }

    let o = orders::create(
        pool,
        OrderCreate {
            user_id,
            lines: vec![OrderLineInput {
                product_id,
                quantity: 2,
            }],
            shipping_address: ShippingAddress {
                recipient: "Ada".into(),
                phone: "1".into(),
                line1: "Via Roma 1".into(),
                city: "Milano".into(),
                postal_code: None,
            },
            payment_method: "card".into(),
            payment_transaction_id: Some("txn".into()),
            shipping_fee: 30_000,
            voucher_usage_id: usage_id,
        },
        &Actor::buyer(user_id),
    )
    .await
    .unwrap();

    orders::transition(pool, o.id, OrderStatus::Delivered, None, &staff())
        .await
        .unwrap();
    (o.id, product_id, usage_id)
}

fn request(order_id: i64, user_id: i64, quantity: i64, product_id: i64) -> ReturnRequestCreate {
    ReturnRequestCreate {
        order_id,
        user_id,
        lines: vec![ReturnLineInput {
            product_id,
            quantity,
            reason: ReturnReason::Defective,
        }],
        reason: ReturnReason::Defective,
        description: None,
    }
}

#[tokio::test]
async fn create_freezes_breakdown() {
    let (db, _dir) = temp_db().await;
    let (order_id, product_id, _) = delivered_order(db.pool(), 1, true).await;

    let r = lifecycle::create(
        db.pool(),
        &RefundPolicy::default(),
        WINDOW_DAYS,
        request(order_id, 1, 1, product_id),
    )
    .await
    .unwrap();

    assert_eq!(r.status, ReturnStatus::Pending);
    assert_eq!(r.refund.returned_lines_subtotal, 500_000);
    assert_eq!(r.refund.proportional_discount, 50_000);
    assert_eq!(r.refund.shipping_deduction, 7_500);
    assert_eq!(r.refund.restocking_fee, 25_000);
    assert_eq!(r.refund_amount, 517_500);
    assert_eq!(r.lines[0].unit_price, 500_000);
}

#[tokio::test]
async fn guard_rejects_undelivered_and_late_and_excess() {
    let (db, _dir) = temp_db().await;
    let policy = RefundPolicy::default();

    // Not delivered
    let pid = product::create(
        db.pool(),
        ProductCreate {
            name: "Gadget".into(),
            category_id: 5,
            price: 100_000,
            stock: 5,
        },
    )
    .await
    .unwrap()
    .id;
    let pending = orders::create(
        db.pool(),
        OrderCreate {
            user_id: 1,
            lines: vec![OrderLineInput { product_id: pid, quantity: 1 }],
            shipping_address: ShippingAddress {
                recipient: "Ada".into(),
                phone: "1".into(),
                line1: "x".into(),
                city: "y".into(),
                postal_code: None,
            },
            payment_method: "card".into(),
            payment_transaction_id: None,
            shipping_fee: 0,
            voucher_usage_id: None,
        },
        &Actor::buyer(1),
    )
    .await
    .unwrap();
    let err = lifecycle::create(db.pool(), &policy, WINDOW_DAYS, request(pending.id, 1, 1, pid))
        .await
        .unwrap_err();
    assert!(matches!(err, ReturnError::OrderNotDelivered));

    // Delivered, but outside the window
    let (order_id, product_id, _) = delivered_order(db.pool(), 2, false).await;
    sqlx::query("UPDATE customer_order SET delivered_at = delivered_at - 8 * 86400000 WHERE id = ?")
        .bind(order_id)
        .execute(db.pool())
        .await
        .unwrap();
    let err = lifecycle::create(db.pool(), &policy, WINDOW_DAYS, request(order_id, 2, 1, product_id))
        .await
        .unwrap_err();
    assert!(matches!(err, ReturnError::WindowExpired));

    // More units than were bought
    let (order_id, product_id, _) = delivered_order(db.pool(), 3, false).await;
    let err = lifecycle::create(db.pool(), &policy, WINDOW_DAYS, request(order_id, 3, 3, product_id))
        .await
        .unwrap_err();
    assert!(matches!(err, ReturnError::QuantityExceeded(_)));

    // No lines at all
    let mut empty = request(order_id, 3, 1, product_id);
    empty.lines.clear();
    let err = lifecycle::create(db.pool(), &policy, WINDOW_DAYS, empty)
        .await
        .unwrap_err();
    assert!(matches!(err, ReturnError::Validation(_)));

    // An empty request must not have taken the open-return slot
    lifecycle::create(db.pool(), &policy, WINDOW_DAYS, request(order_id, 3, 1, product_id))
        .await
        .unwrap();
}

#[tokio::test]
async fn split_lines_are_capped_by_the_purchased_quantity() {
    let (db, _dir) = temp_db().await;
    let (order_id, product_id, _) = delivered_order(db.pool(), 1, false).await;
    let policy = RefundPolicy::default();

    // Two lines for the same product, each within the bought quantity,
    // but 4 units against a purchase of 2
    let mut split = request(order_id, 1, 2, product_id);
    split.lines.push(ReturnLineInput {
        product_id,
        quantity: 2,
        reason: ReturnReason::NotAsDescribed,
    });
    let err = lifecycle::create(db.pool(), &policy, WINDOW_DAYS, split)
        .await
        .unwrap_err();
    assert!(matches!(err, ReturnError::QuantityExceeded(_)));

    // A split that stays within the purchase is a full return
    let mut split = request(order_id, 1, 1, product_id);
    split.lines.push(ReturnLineInput {
        product_id,
        quantity: 1,
        reason: ReturnReason::NotAsDescribed,
    });
    let r = lifecycle::create(db.pool(), &policy, WINDOW_DAYS, split)
        .await
        .unwrap();
    assert_eq!(r.refund.returned_lines_subtotal, 1_000_000);
    assert_eq!(r.refund_amount, 950_000);
}

#[tokio::test]
async fn one_open_return_per_order() {
    let (db, _dir) = temp_db().await;
    let (order_id, product_id, _) = delivered_order(db.pool(), 1, false).await;
    let policy = RefundPolicy::default();

    let first = lifecycle::create(db.pool(), &policy, WINDOW_DAYS, request(order_id, 1, 1, product_id))
        .await
        .unwrap();
    let err = lifecycle::create(db.pool(), &policy, WINDOW_DAYS, request(order_id, 1, 1, product_id))
        .await
        .unwrap_err();
    assert!(matches!(err, ReturnError::AlreadyOpen));

    // A rejected request frees the slot
    lifecycle::reject(db.pool(), first.id, Some("Damaged by buyer"), &staff())
        .await
        .unwrap();
    lifecycle::create(db.pool(), &policy, WINDOW_DAYS, request(order_id, 1, 1, product_id))
        .await
        .unwrap();
}

#[tokio::test]
async fn open_return_is_unique_at_the_database() {
    let (db, _dir) = temp_db().await;
    let (order_id, product_id, _) = delivered_order(db.pool(), 1, false).await;
    let policy = RefundPolicy::default();

    lifecycle::create(db.pool(), &policy, WINDOW_DAYS, request(order_id, 1, 1, product_id))
        .await
        .unwrap();

    // A second insert that slipped past the read guard still loses
    let o = order::find_by_id(db.pool(), order_id).await.unwrap().unwrap();
    let lines = vec![ReturnLine {
        product_id,
        name: "Widget".into(),
        quantity: 1,
        unit_price: 500_000,
        reason: ReturnReason::Defective,
    }];
    let breakdown = refund::compute(&policy, &o, &lines);
    let err = return_request::insert(
        db.pool(),
        return_request::ReturnInsert {
            order_id,
            order_number: o.order_number.clone(),
            user_id: 1,
            lines,
            reason: ReturnReason::Defective,
            description: None,
            refund: breakdown,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(_)));
}

#[tokio::test]
async fn full_flow_restores_stock_and_refunds() {
    let (db, _dir) = temp_db().await;
    let (order_id, product_id, usage_id) = delivered_order(db.pool(), 1, true).await;
    let usage_id = usage_id.unwrap();

    let r = lifecycle::create(
        db.pool(),
        &RefundPolicy::default(),
        WINDOW_DAYS,
        request(order_id, 1, 2, product_id),
    )
    .await
    .unwrap();

    lifecycle::approve(db.pool(), r.id, None, &staff()).await.unwrap();

    let processing = lifecycle::start_processing(db.pool(), r.id, &staff()).await.unwrap();
    assert_eq!(processing.status, ReturnStatus::Processing);
    let p = product::find_by_id(db.pool(), product_id).await.unwrap().unwrap();
    assert_eq!(p.stock, 10);
    let o = order::find_by_id(db.pool(), order_id).await.unwrap().unwrap();
    assert_eq!(o.status, OrderStatus::Returned);

    let completed = lifecycle::complete(db.pool(), r.id, &staff()).await.unwrap();
    assert_eq!(completed.status, ReturnStatus::Completed);
    assert_eq!(completed.refund_status, RefundStatus::Refunded);

    let o = order::find_by_id(db.pool(), order_id).await.unwrap().unwrap();
    assert_eq!(o.payment_status, PaymentStatus::Refunded);

    // Voucher capacity went back to the pool
    let usage = voucher_usage::find_by_id(db.pool(), usage_id).await.unwrap().unwrap();
    assert_eq!(usage.status, UsageStatus::Refunded);
    let v = voucher::find_by_id(db.pool(), usage.voucher_id).await.unwrap().unwrap();
    assert_eq!(v.used_count, 0);
}

#[tokio::test]
async fn stage_guards_hold() {
    let (db, _dir) = temp_db().await;
    let (order_id, product_id, _) = delivered_order(db.pool(), 1, false).await;

    let r = lifecycle::create(
        db.pool(),
        &RefundPolicy::default(),
        WINDOW_DAYS,
        request(order_id, 1, 1, product_id),
    )
    .await
    .unwrap();

    // Receipt before approval is rejected
    let err = lifecycle::start_processing(db.pool(), r.id, &staff()).await.unwrap_err();
    assert!(matches!(err, ReturnError::InvalidTransition { .. }));

    // Buyer cannot approve
    let err = lifecycle::approve(db.pool(), r.id, None, &Actor::buyer(1)).await.unwrap_err();
    assert!(matches!(err, ReturnError::PermissionDenied));

    // Buyer can cancel while pending, but not someone else's request
    let err = lifecycle::cancel(db.pool(), r.id, &Actor::buyer(2)).await.unwrap_err();
    assert!(matches!(err, ReturnError::PermissionDenied));
    let cancelled = lifecycle::cancel(db.pool(), r.id, &Actor::buyer(1)).await.unwrap();
    assert_eq!(cancelled.status, ReturnStatus::Cancelled);

    // And not again once terminal
    let err = lifecycle::cancel(db.pool(), r.id, &Actor::buyer(1)).await.unwrap_err();
    assert!(matches!(err, ReturnError::InvalidTransition { .. }));
}
