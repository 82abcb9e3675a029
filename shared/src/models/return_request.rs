//! Return Request Model

use serde::{Deserialize, Serialize};

/// Return request status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    Processing,
    Completed,
    Cancelled,
}

impl ReturnStatus {
    /// Terminal requests never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReturnStatus::Rejected | ReturnStatus::Completed | ReturnStatus::Cancelled
        )
    }
}

/// Refund progress for a return request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum RefundStatus {
    Pending,
    Processing,
    Refunded,
}

/// Reason a buyer gives for returning an item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ReturnReason {
    Defective,
    WrongItem,
    NotAsDescribed,
    ChangedMind,
    Damaged,
    Other,
}

/// Return line — quantity must not exceed the purchased quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    /// Unit price snapshot copied from the order line
    pub unit_price: i64,
    pub reason: ReturnReason,
}

/// Refund breakdown, frozen at request creation and never recomputed.
/// Every intermediate term is persisted for audit and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundBreakdown {
    pub order_quantity: i64,
    pub returned_quantity: i64,
    /// returned_quantity / order_quantity
    pub return_ratio: f64,
    /// Sum of returned line subtotals (currency units)
    pub returned_lines_subtotal: i64,
    /// Share of the order discount attributed to the returned lines
    pub proportional_discount: i64,
    /// Partial-return shipping penalty (0 for a full return)
    pub shipping_deduction: i64,
    pub restocking_fee: i64,
    /// Treated as a full return (no shipping clawback)
    pub full_return: bool,
    /// max(0, subtotal + proportional_discount - shipping_deduction - restocking_fee)
    pub total_refund: i64,
}

/// Return request entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ReturnRequest {
    pub id: i64,
    pub order_id: i64,
    /// Order number snapshot for display and log lines
    pub order_number: String,
    pub user_id: i64,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub lines: Vec<ReturnLine>,
    /// Primary reason; individual lines may carry their own
    pub reason: ReturnReason,
    pub description: Option<String>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub refund: RefundBreakdown,
    /// Copy of `refund.total_refund`, kept as a column for queries
    pub refund_amount: i64,
    pub status: ReturnStatus,
    pub refund_status: RefundStatus,
    /// Set when support approves or rejects the request
    pub resolution_note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Return line input from the buyer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnLineInput {
    pub product_id: i64,
    pub quantity: i64,
    pub reason: ReturnReason,
}

/// Create return request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRequestCreate {
    pub order_id: i64,
    pub user_id: i64,
    pub lines: Vec<ReturnLineInput>,
    pub reason: ReturnReason,
    pub description: Option<String>,
}
