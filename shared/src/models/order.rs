//! Order Model

use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipping,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    /// Terminal orders accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }
}

/// Payment status recorded from the payment-gateway collaborator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

/// Order line item — unit price is snapshotted at creation and never
/// re-read from the live catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: i64,
    pub name: String,
    /// Unit price in currency units, snapshotted at order creation
    pub price: i64,
    pub quantity: i64,
    /// price * quantity
    pub line_total: i64,
}

/// Shipping address embedded in the order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub city: String,
    pub postal_code: Option<String>,
}

/// Payment descriptor embedded in the order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: i64,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub items: Vec<OrderItem>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub payment_transaction_id: Option<String>,
    /// Sum of line totals (currency units)
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub discount_amount: i64,
    /// subtotal + shipping_fee - discount_amount, recomputed on every persist
    pub total_amount: i64,
    pub status: OrderStatus,
    /// Stamped when the order first reaches DELIVERED (Unix millis);
    /// starts the return-eligibility clock
    pub delivered_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Total quantity across all line items
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Find a line item by product id
    pub fn item(&self, product_id: i64) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Payment descriptor assembled from the stored columns
    pub fn payment(&self) -> PaymentInfo {
        PaymentInfo {
            method: self.payment_method.clone(),
            status: self.payment_status,
            transaction_id: self.payment_transaction_id.clone(),
        }
    }
}

/// Append-only status history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderStatusEntry {
    pub id: i64,
    pub order_id: i64,
    pub status: OrderStatus,
    pub note: Option<String>,
    pub actor_id: i64,
    pub actor_name: Option<String>,
    pub created_at: i64,
}

/// Checkout line input — priced by the core at creation, never by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: i64,
    pub quantity: i64,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub user_id: i64,
    pub lines: Vec<OrderLineInput>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_transaction_id: Option<String>,
    pub shipping_fee: i64,
    /// Ledger reservation to consume, if a voucher was applied at cart stage
    pub voucher_usage_id: Option<i64>,
}
