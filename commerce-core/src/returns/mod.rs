//! Return Subsystem
//!
//! Post-delivery returns: the [`refund`] calculator freezes a breakdown
//! at request creation, and the [`lifecycle`] walks the request through
//! approval, receipt, and refund.

pub mod lifecycle;
pub mod refund;

pub use lifecycle::{ReturnError, ReturnResult};
pub use refund::RefundPolicy;

#[cfg(test)]
mod tests;
