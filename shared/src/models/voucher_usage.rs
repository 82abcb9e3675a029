//! Voucher Usage Model
//!
//! The audit-and-lock unit tracking one redemption attempt against a
//! voucher. A row is born PENDING when the ledger reserves capacity at
//! cart stage, flips to USED when an order consumes the reservation, and
//! ends CANCELLED or REFUNDED when the reservation is unwound.

use serde::{Deserialize, Serialize};

/// Usage record status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum UsageStatus {
    Pending,
    Used,
    Cancelled,
    Refunded,
}

impl UsageStatus {
    /// Terminal records never change again and hold no voucher capacity
    pub fn is_terminal(&self) -> bool {
        matches!(self, UsageStatus::Cancelled | UsageStatus::Refunded)
    }
}

/// Voucher usage record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct VoucherUsage {
    pub id: i64,
    pub voucher_id: i64,
    pub user_id: i64,
    /// Set at commit time
    pub order_id: Option<i64>,
    pub order_number: Option<String>,
    /// Checkout correlation id for the cart-stage reservation
    pub pending_ref: Option<String>,
    pub status: UsageStatus,
    /// Discount applied, in currency units (0 until commit)
    pub discount_amount: i64,
    pub order_amount: i64,
    pub final_amount: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!UsageStatus::Pending.is_terminal());
        assert!(!UsageStatus::Used.is_terminal());
        assert!(UsageStatus::Cancelled.is_terminal());
        assert!(UsageStatus::Refunded.is_terminal());
    }
}
