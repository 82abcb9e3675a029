use super::lifecycle::{self, Actor, OrderError};
use crate::db::repository::{product, voucher, voucher_usage};
use crate::db::testing::temp_db;
use crate::vouchers::ledger;
use shared::models::{
    OrderCreate, OrderLineInput, OrderStatus, PaymentStatus, ProductCreate, ShippingAddress,
    UsageStatus, VoucherCreate, VoucherType,
};
use shared::util::now_millis;
use sqlx::SqlitePool;

fn address() -> ShippingAddress {
    ShippingAddress {
        recipient: "Ada".into(),
        phone: "+3912345678".into(),
        line1: "Via Roma 1".into(),
        city: "Milano".into(),
        postal_code: Some("20121".into()),
    }
}

fn create_payload(user_id: i64, lines: Vec<OrderLineInput>) -> OrderCreate {
    OrderCreate {
        user_id,
        lines,
        shipping_address: address(),
        payment_method: "card".into(),
        payment_transaction_id: Some("txn-1".into()),
        shipping_fee: 30_000,
        voucher_usage_id: None,
    }
}

async fn seed_product(pool: &SqlitePool, price: i64, stock: i64) -> i64 {
    product::create(
        pool,
        ProductCreate {
            name: "Widget".into(),
            category_id: 5,
            price,
            stock,
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_voucher(pool: &SqlitePool, value: i64) -> i64 {
    let now = now_millis();
    voucher::create(
        pool,
        VoucherCreate {
            code: "SAVE".into(),
            name: "Save".into(),
            voucher_type: VoucherType::FixedAmount,
            value,
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
    .unwrap()
    .id
}

#[tokio::test]
async fn create_snapshots_prices_and_takes_stock() {
    let (db, _dir) = temp_db().await;
    let pid = seed_product(db.pool(), 500_000, 5).await;

    let order = lifecycle::create(
        db.pool(),
        create_payload(1, vec![OrderLineInput { product_id: pid, quantity: 2 }]),
        &Actor::buyer(1),
    )
    .await
    .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal, 1_000_000);
    assert_eq!(order.total_amount, 1_030_000);
    assert_eq!(order.items[0].price, 500_000);
    assert_eq!(order.payment_status, PaymentStatus::Paid);

    let p = product::find_by_id(db.pool(), pid).await.unwrap().unwrap();
    assert_eq!(p.stock, 3);
    assert_eq!(p.sold, 2);

    let history = lifecycle::history(db.pool(), order.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, OrderStatus::Pending);
}

#[tokio::test]
async fn create_compensates_stock_when_a_line_is_short() {
    let (db, _dir) = temp_db().await;
    let plenty = seed_product(db.pool(), 100_000, 10).await;
    let scarce = seed_product(db.pool(), 200_000, 1).await;

    let err = lifecycle::create(
        db.pool(),
        create_payload(
            1,
            vec![
                OrderLineInput { product_id: plenty, quantity: 3 },
                OrderLineInput { product_id: scarce, quantity: 2 },
            ],
        ),
        &Actor::buyer(1),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, OrderError::InsufficientStock(id) if id == scarce));
    // The first line's decrement was undone
    let p = product::find_by_id(db.pool(), plenty).await.unwrap().unwrap();
    assert_eq!(p.stock, 10);
    assert_eq!(p.sold, 0);
}

#[tokio::test]
async fn create_commits_voucher_reservation() {
    let (db, _dir) = temp_db().await;
    let pid = seed_product(db.pool(), 500_000, 5).await;
    let vid = seed_voucher(db.pool(), 100_000).await;
    let usage_id = ledger::lock(db.pool(), vid, 1, Some("co-1")).await.unwrap();

    let mut payload = create_payload(1, vec![OrderLineInput { product_id: pid, quantity: 2 }]);
    payload.voucher_usage_id = Some(usage_id);
    let order = lifecycle::create(db.pool(), payload, &Actor::buyer(1)).await.unwrap();

    assert_eq!(order.discount_amount, 100_000);
    assert_eq!(order.total_amount, 1_000_000 + 30_000 - 100_000);

    let usage = voucher_usage::find_by_id(db.pool(), usage_id).await.unwrap().unwrap();
    assert_eq!(usage.status, UsageStatus::Used);
    assert_eq!(usage.order_id, Some(order.id));
    assert_eq!(usage.final_amount, order.total_amount);
}

#[tokio::test]
async fn create_unwinds_when_reservation_was_swept() {
    let (db, _dir) = temp_db().await;
    let pid = seed_product(db.pool(), 500_000, 5).await;
    let vid = seed_voucher(db.pool(), 100_000).await;
    let usage_id = ledger::lock(db.pool(), vid, 1, Some("co-1")).await.unwrap();

    // Simulate: validated at cart stage, then another path rolled the
    // reservation back before checkout finished. The usage is read before
    // stock is touched, so creation fails before any side effect.
    ledger::rollback(db.pool(), usage_id, UsageStatus::Cancelled).await.unwrap();

    let mut payload = create_payload(1, vec![OrderLineInput { product_id: pid, quantity: 2 }]);
    payload.voucher_usage_id = Some(usage_id);
    let err = lifecycle::create(db.pool(), payload, &Actor::buyer(1)).await.unwrap_err();
    assert!(matches!(err, OrderError::Ledger(_)));

    let p = product::find_by_id(db.pool(), pid).await.unwrap().unwrap();
    assert_eq!(p.stock, 5);
}

#[tokio::test]
async fn staff_transitions_walk_forward_and_stamp_delivery() {
    let (db, _dir) = temp_db().await;
    let pid = seed_product(db.pool(), 100_000, 5).await;
    let order = lifecycle::create(
        db.pool(),
        create_payload(1, vec![OrderLineInput { product_id: pid, quantity: 1 }]),
        &Actor::buyer(1),
    )
    .await
    .unwrap();

    let staff = Actor::staff(900, "ops");
    lifecycle::transition(db.pool(), order.id, OrderStatus::Confirmed, None, &staff)
        .await
        .unwrap();
    lifecycle::transition(db.pool(), order.id, OrderStatus::Shipping, Some("Courier picked up"), &staff)
        .await
        .unwrap();
    let delivered = lifecycle::transition(db.pool(), order.id, OrderStatus::Delivered, None, &staff)
        .await
        .unwrap();
    assert!(delivered.delivered_at.is_some());

    // Backwards is rejected with no mutation
    let err = lifecycle::transition(db.pool(), order.id, OrderStatus::Shipping, None, &staff)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));

    let history = lifecycle::history(db.pool(), order.id).await.unwrap();
    let statuses: Vec<OrderStatus> = history.iter().map(|h| h.status).collect();
    assert_eq!(
        statuses,
        vec![
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipping,
            OrderStatus::Delivered
        ]
    );
}

#[tokio::test]
async fn buyers_cannot_drive_fulfilment() {
    let (db, _dir) = temp_db().await;
    let pid = seed_product(db.pool(), 100_000, 5).await;
    let order = lifecycle::create(
        db.pool(),
        create_payload(1, vec![OrderLineInput { product_id: pid, quantity: 1 }]),
        &Actor::buyer(1),
    )
    .await
    .unwrap();

    let err = lifecycle::transition(db.pool(), order.id, OrderStatus::Confirmed, None, &Actor::buyer(1))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::PermissionDenied));
}

#[tokio::test]
async fn cancel_restores_stock_and_rolls_back_voucher() {
    let (db, _dir) = temp_db().await;
    let pid = seed_product(db.pool(), 500_000, 5).await;
    let vid = seed_voucher(db.pool(), 100_000).await;
    let usage_id = ledger::lock(db.pool(), vid, 1, None).await.unwrap();

    let mut payload = create_payload(1, vec![OrderLineInput { product_id: pid, quantity: 2 }]);
    payload.voucher_usage_id = Some(usage_id);
    let order = lifecycle::create(db.pool(), payload, &Actor::buyer(1)).await.unwrap();

    let cancelled = lifecycle::cancel(db.pool(), order.id, &Actor::buyer(1)).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let p = product::find_by_id(db.pool(), pid).await.unwrap().unwrap();
    assert_eq!(p.stock, 5);
    assert_eq!(p.sold, 0);

    let usage = voucher_usage::find_by_id(db.pool(), usage_id).await.unwrap().unwrap();
    assert_eq!(usage.status, UsageStatus::Cancelled);
    let v = voucher::find_by_id(db.pool(), vid).await.unwrap().unwrap();
    assert_eq!(v.used_count, 0);
}

#[tokio::test]
async fn cancellation_only_goes_through_the_cancel_path() {
    let (db, _dir) = temp_db().await;
    let pid = seed_product(db.pool(), 500_000, 5).await;
    let vid = seed_voucher(db.pool(), 100_000).await;
    let usage_id = ledger::lock(db.pool(), vid, 1, None).await.unwrap();

    let mut payload = create_payload(1, vec![OrderLineInput { product_id: pid, quantity: 2 }]);
    payload.voucher_usage_id = Some(usage_id);
    let order = lifecycle::create(db.pool(), payload, &Actor::buyer(1)).await.unwrap();

    // The generic transition would skip stock restoration and the
    // voucher rollback, so it refuses CANCELLED even for staff
    let err = lifecycle::transition(
        db.pool(),
        order.id,
        OrderStatus::Cancelled,
        None,
        &Actor::staff(900, "ops"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));

    // Nothing moved
    let current = lifecycle::get(db.pool(), order.id).await.unwrap();
    assert_eq!(current.status, OrderStatus::Pending);
    let p = product::find_by_id(db.pool(), pid).await.unwrap().unwrap();
    assert_eq!(p.stock, 3);
    assert_eq!(p.sold, 2);

    // cancel() still works and compensates
    let cancelled = lifecycle::cancel(db.pool(), order.id, &Actor::staff(900, "ops")).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    let p = product::find_by_id(db.pool(), pid).await.unwrap().unwrap();
    assert_eq!(p.stock, 5);
    let usage = voucher_usage::find_by_id(db.pool(), usage_id).await.unwrap().unwrap();
    assert_eq!(usage.status, UsageStatus::Cancelled);
}

#[tokio::test]
async fn cancel_is_rejected_after_confirmation() {
    let (db, _dir) = temp_db().await;
    let pid = seed_product(db.pool(), 100_000, 5).await;
    let order = lifecycle::create(
        db.pool(),
        create_payload(1, vec![OrderLineInput { product_id: pid, quantity: 2 }]),
        &Actor::buyer(1),
    )
    .await
    .unwrap();
    lifecycle::transition(
        db.pool(),
        order.id,
        OrderStatus::Confirmed,
        None,
        &Actor::staff(900, "ops"),
    )
    .await
    .unwrap();

    let err = lifecycle::cancel(db.pool(), order.id, &Actor::buyer(1)).await.unwrap_err();
    assert!(matches!(err, OrderError::NotCancellable(OrderStatus::Confirmed)));

    // No mutation happened
    let p = product::find_by_id(db.pool(), pid).await.unwrap().unwrap();
    assert_eq!(p.stock, 3);
}

#[tokio::test]
async fn cancel_requires_ownership() {
    let (db, _dir) = temp_db().await;
    let pid = seed_product(db.pool(), 100_000, 5).await;
    let order = lifecycle::create(
        db.pool(),
        create_payload(1, vec![OrderLineInput { product_id: pid, quantity: 1 }]),
        &Actor::buyer(1),
    )
    .await
    .unwrap();

    let err = lifecycle::cancel(db.pool(), order.id, &Actor::buyer(2)).await.unwrap_err();
    assert!(matches!(err, OrderError::PermissionDenied));
}
