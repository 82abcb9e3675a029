//! Transactional core of an online retail platform.
//!
//! Reconciles limited-use promotional vouchers against concurrent
//! checkouts and governs the order and return state machines:
//!
//! - [`vouchers`] — discount math, the rule engine, and the redemption
//!   ledger (atomic lock/commit/rollback over a shared usage counter)
//! - [`orders`] — order creation with stock side effects and the
//!   forward-only status machine
//! - [`returns`] — post-delivery returns with a frozen refund breakdown
//! - [`db`] — SQLite storage; every race-sensitive write is one
//!   conditional UPDATE checked through `rows_affected()`
//!
//! Catalog browsing, identity, and payment transport are collaborators
//! of this crate, not part of it.

pub mod core;
pub mod db;
pub mod money;
pub mod orders;
pub mod returns;
pub mod utils;
pub mod vouchers;

pub use crate::core::{CommerceCore, Config};
pub use db::DbService;
pub use orders::{Actor, ActorRole, OrderError};
pub use returns::{RefundPolicy, ReturnError};
pub use vouchers::{LedgerError, Validation, ValidationContext, ValidationOptions};
