//! Persisted data shapes for the checkout core

pub mod order;
pub mod product;
pub mod return_request;
pub mod voucher;
pub mod voucher_usage;

pub use order::{
    Order, OrderCreate, OrderItem, OrderLineInput, OrderStatus, OrderStatusEntry, PaymentInfo,
    PaymentStatus, ShippingAddress,
};
pub use product::{Product, ProductCreate};
pub use return_request::{
    RefundBreakdown, RefundStatus, ReturnLine, ReturnLineInput, ReturnReason, ReturnRequest,
    ReturnRequestCreate, ReturnStatus,
};
pub use voucher::{Voucher, VoucherCreate, VoucherType, VoucherUpdate};
pub use voucher_usage::{UsageStatus, VoucherUsage};
