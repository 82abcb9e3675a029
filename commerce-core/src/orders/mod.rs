//! Order Subsystem
//!
//! The order state machine and its side effects: stock decrements at
//! creation, voucher commit/rollback triggers, and the append-only
//! status history.

pub mod lifecycle;

pub use lifecycle::{Actor, ActorRole, OrderError, OrderResult};

#[cfg(test)]
mod tests;
