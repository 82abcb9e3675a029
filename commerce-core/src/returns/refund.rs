//! Refund Calculator
//!
//! Computes the refund breakdown for a return request. The result is
//! frozen into the request at creation and never recomputed, even if the
//! order changes afterwards. Ratios are business constants with no stated
//! derivation; they live in [`RefundPolicy`] rather than in the code.

use crate::money;
use rust_decimal::prelude::*;
use shared::models::{Order, RefundBreakdown, ReturnLine};

/// Tunable refund ratios
#[derive(Debug, Clone, Copy)]
pub struct RefundPolicy {
    /// Share of the prorated shipping fee deducted on a partial return
    pub shipping_clawback_ratio: Decimal,
    /// Share of the returned subtotal deducted as handling cost
    pub restocking_fee_ratio: Decimal,
    /// Return ratio at or above which the return counts as full and no
    /// shipping is clawed back
    pub full_return_threshold: Decimal,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            shipping_clawback_ratio: Decimal::new(50, 2),
            restocking_fee_ratio: Decimal::new(5, 2),
            full_return_threshold: Decimal::new(95, 2),
        }
    }
}

/// Compute the breakdown for returning `lines` out of `order`.
///
/// The discount the buyer received on the returned goods is added back
/// proportionally, so a partial return does not silently strip the
/// discount from the kept items. `total_refund` is clamped at zero.
pub fn compute(policy: &RefundPolicy, order: &Order, lines: &[ReturnLine]) -> RefundBreakdown {
    let order_quantity = order.total_quantity();
    let returned_quantity: i64 = lines.iter().map(|l| l.quantity).sum();
    let returned_lines_subtotal: i64 = lines.iter().map(|l| l.unit_price * l.quantity).sum();

    let ratio = if order_quantity > 0 {
        Decimal::from(returned_quantity) / Decimal::from(order_quantity)
    } else {
        Decimal::ZERO
    };
    let full_return = ratio >= policy.full_return_threshold;

    let proportional_discount =
        money::prorate(order.discount_amount, returned_lines_subtotal, order.subtotal);

    let shipping_deduction = if full_return {
        0
    } else {
        money::round_units(
            Decimal::from(order.shipping_fee) * ratio * policy.shipping_clawback_ratio,
        )
    };

    let restocking_fee = money::apply_ratio(returned_lines_subtotal, policy.restocking_fee_ratio);

    let total_refund = (returned_lines_subtotal + proportional_discount
        - shipping_deduction
        - restocking_fee)
        .max(0);

    RefundBreakdown {
        order_quantity,
        returned_quantity,
        return_ratio: ratio.to_f64().unwrap_or(0.0),
        returned_lines_subtotal,
        proportional_discount,
        shipping_deduction,
        restocking_fee,
        full_return,
        total_refund,
    }
}
