//! Voucher Model

use serde::{Deserialize, Serialize};

/// Voucher type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum VoucherType {
    Percentage,
    FixedAmount,
    FreeShipping,
}

/// Voucher entity — a promotional code with a bounded redemption budget
///
/// `used_count` is only ever mutated through the ledger's atomic
/// conditional updates; `used_count <= usage_limit` holds at all times,
/// including under concurrent writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Voucher {
    pub id: i64,
    /// Unique redemption code
    pub code: String,
    pub name: String,
    pub voucher_type: VoucherType,
    /// Percentage value (30 = 30%) or fixed amount in currency units
    pub value: i64,
    /// Minimum order amount required to apply (currency units)
    pub min_order_amount: i64,
    /// Cap for percentage discounts (currency units)
    pub max_discount_amount: Option<i64>,
    /// Total redemption capacity
    pub usage_limit: i64,
    /// Redemptions reserved or consumed so far
    pub used_count: i64,
    /// Validity window start (Unix millis)
    pub valid_from: i64,
    /// Validity window end (Unix millis)
    pub valid_to: i64,
    /// Redemptions allowed per user (pending + used records both count)
    pub per_user_limit: i64,
    /// Only users with no prior USED record for this voucher
    pub first_use_only: bool,
    /// Only accounts created after the voucher's valid_from
    pub new_user_only: bool,
    pub min_cart_quantity: Option<i64>,
    pub max_cart_quantity: Option<i64>,
    /// Whether this voucher may combine with others in one checkout
    pub is_stackable: bool,
    /// User allow-list (JSON array, empty = everyone)
    #[cfg_attr(feature = "db", sqlx(json))]
    pub applicable_users: Vec<i64>,
    /// Applicable product ids (JSON array, empty = all products)
    #[cfg_attr(feature = "db", sqlx(json))]
    pub applicable_products: Vec<i64>,
    /// Excluded product ids (JSON array)
    #[cfg_attr(feature = "db", sqlx(json))]
    pub excluded_products: Vec<i64>,
    /// Applicable category ids (JSON array, empty = all categories)
    #[cfg_attr(feature = "db", sqlx(json))]
    pub applicable_categories: Vec<i64>,
    /// Excluded category ids (JSON array)
    #[cfg_attr(feature = "db", sqlx(json))]
    pub excluded_categories: Vec<i64>,
    pub priority: i64,
    pub is_active: bool,
    pub created_by: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Voucher {
    /// Remaining redemption capacity
    pub fn remaining(&self) -> i64 {
        (self.usage_limit - self.used_count).max(0)
    }

    /// Whether `now` falls inside the validity window
    pub fn in_window(&self, now: i64) -> bool {
        self.valid_from <= now && now <= self.valid_to
    }
}

/// Create voucher payload (administrator operation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherCreate {
    pub code: String,
    pub name: String,
    pub voucher_type: VoucherType,
    pub value: i64,
    pub min_order_amount: Option<i64>,
    pub max_discount_amount: Option<i64>,
    pub usage_limit: i64,
    pub valid_from: i64,
    pub valid_to: i64,
    pub per_user_limit: Option<i64>,
    pub first_use_only: Option<bool>,
    pub new_user_only: Option<bool>,
    pub min_cart_quantity: Option<i64>,
    pub max_cart_quantity: Option<i64>,
    pub is_stackable: Option<bool>,
    pub applicable_users: Option<Vec<i64>>,
    pub applicable_products: Option<Vec<i64>>,
    pub excluded_products: Option<Vec<i64>>,
    pub applicable_categories: Option<Vec<i64>>,
    pub excluded_categories: Option<Vec<i64>>,
    pub priority: Option<i64>,
    pub created_by: Option<i64>,
}

/// Update voucher payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoucherUpdate {
    pub name: Option<String>,
    pub value: Option<i64>,
    pub min_order_amount: Option<i64>,
    pub max_discount_amount: Option<i64>,
    pub usage_limit: Option<i64>,
    pub valid_from: Option<i64>,
    pub valid_to: Option<i64>,
    pub per_user_limit: Option<i64>,
    pub priority: Option<i64>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voucher() -> Voucher {
        Voucher {
            id: 1,
            code: "T".into(),
            name: "T".into(),
            voucher_type: VoucherType::Percentage,
            value: 10,
            min_order_amount: 0,
            max_discount_amount: None,
            usage_limit: 3,
            used_count: 2,
            valid_from: 1000,
            valid_to: 2000,
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
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn remaining_never_negative() {
        let mut v = voucher();
        assert_eq!(v.remaining(), 1);
        v.used_count = 5;
        assert_eq!(v.remaining(), 0);
    }

    #[test]
    fn window_is_inclusive() {
        let v = voucher();
        assert!(v.in_window(1000));
        assert!(v.in_window(2000));
        assert!(!v.in_window(999));
        assert!(!v.in_window(2001));
    }
}
