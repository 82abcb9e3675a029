//! Discount Calculator
//!
//! Pure functions mapping a voucher and an order amount to a discount. No
//! storage access; the rule engine uses these for preview output and the
//! order lifecycle for the final amounts.

use crate::money;
use shared::models::{Voucher, VoucherType};
use shared::ErrorCode;

/// Result of applying a voucher to an order amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DiscountBreakdown {
    /// Amount taken off, in whole currency units
    pub discount_amount: i64,
    /// Order amount after the discount, before shipping
    pub final_price: i64,
    /// Amount the buyer pays including shipping
    pub total_amount: i64,
    /// Shipping is waived rather than the goods discounted
    pub free_shipping: bool,
}

/// Outcome of re-checking an applied voucher against a changed cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recalculation {
    Valid(DiscountBreakdown),
    Invalid { code: ErrorCode },
}

/// Compute the discount for `order_amount` (goods subtotal, shipping
/// excluded). The discount never exceeds the order amount.
pub fn calculate(voucher: &Voucher, order_amount: i64, shipping_fee: i64) -> DiscountBreakdown {
    match voucher.voucher_type {
        VoucherType::Percentage => {
            let mut discount = money::prorate(order_amount, voucher.value, 100);
            if let Some(cap) = voucher.max_discount_amount {
                discount = discount.min(cap);
            }
            let discount = discount.min(order_amount);
            let final_price = order_amount - discount;
            DiscountBreakdown {
                discount_amount: discount,
                final_price,
                total_amount: final_price + shipping_fee,
                free_shipping: false,
            }
        }
        VoucherType::FixedAmount => {
            let discount = voucher.value.min(order_amount);
            let final_price = order_amount - discount;
            DiscountBreakdown {
                discount_amount: discount,
                final_price,
                total_amount: final_price + shipping_fee,
                free_shipping: false,
            }
        }
        VoucherType::FreeShipping => DiscountBreakdown {
            discount_amount: shipping_fee,
            final_price: order_amount,
            // Shipping is waived, so the payable total excludes it
            total_amount: order_amount,
            free_shipping: true,
        },
    }
}

/// Re-check an already-applied voucher after the cart total changed.
/// The minimum-spend condition is the only one that depends on the amount;
/// everything else was settled when the voucher was applied.
pub fn recalculate(voucher: &Voucher, new_order_amount: i64, shipping_fee: i64) -> Recalculation {
    if new_order_amount < voucher.min_order_amount {
        return Recalculation::Invalid {
            code: ErrorCode::MinOrderNotMet,
        };
    }
    Recalculation::Valid(calculate(voucher, new_order_amount, shipping_fee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::util::now_millis;

    fn voucher(voucher_type: VoucherType, value: i64) -> Voucher {
        let now = now_millis();
        Voucher {
            id: 1,
            code: "TEST".into(),
            name: "Test voucher".into(),
            voucher_type,
            value,
            min_order_amount: 0,
            max_discount_amount: None,
            usage_limit: 100,
            used_count: 0,
            valid_from: now - 1000,
            valid_to: now + 86_400_000,
            per_user_limit: 1,
            first_use_only: false,
            new_user_only: false,
            min_cart_quantity: None,
            max_cart_quantity: None,
            is_stackable: false,
            applicable_users: vec![],
            applicable_products: vec![],
            excluded_products: vec![],
            applicable_categories: vec![],
            excluded_categories: vec![],
            priority: 0,
            is_active: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn percentage_capped_by_max_discount() {
        let mut v = voucher(VoucherType::Percentage, 10);
        v.max_discount_amount = Some(50_000);
        let d = calculate(&v, 800_000, 0);
        assert_eq!(d.discount_amount, 50_000);
        assert_eq!(d.final_price, 750_000);
    }

    #[test]
    fn percentage_uncapped() {
        let v = voucher(VoucherType::Percentage, 10);
        let d = calculate(&v, 800_000, 30_000);
        assert_eq!(d.discount_amount, 80_000);
        assert_eq!(d.total_amount, 750_000);
    }

    #[test]
    fn fixed_amount_never_exceeds_order() {
        let v = voucher(VoucherType::FixedAmount, 50_000);
        let d = calculate(&v, 30_000, 0);
        assert_eq!(d.discount_amount, 30_000);
        assert_eq!(d.final_price, 0);
    }

    #[test]
    fn free_shipping_excludes_shipping_from_total() {
        let v = voucher(VoucherType::FreeShipping, 0);
        let d = calculate(&v, 200_000, 30_000);
        assert_eq!(d.discount_amount, 30_000);
        assert_eq!(d.final_price, 200_000);
        assert_eq!(d.total_amount, 200_000);
        assert!(d.free_shipping);
    }

    #[test]
    fn recalculate_rejects_below_minimum() {
        let mut v = voucher(VoucherType::FixedAmount, 10_000);
        v.min_order_amount = 100_000;
        assert!(matches!(
            recalculate(&v, 90_000, 0),
            Recalculation::Invalid {
                code: ErrorCode::MinOrderNotMet
            }
        ));
        assert!(matches!(recalculate(&v, 100_000, 0), Recalculation::Valid(_)));
    }
}
