//! Voucher Subsystem
//!
//! Three layers: the [`discount`] calculator (pure math), the [`engine`]
//! (stateless rule validation), and the [`ledger`] (atomic
//! lock/commit/rollback of redemption capacity). The [`sweeper`] reclaims
//! abandoned reservations in the background.

pub mod discount;
pub mod engine;
pub mod ledger;
pub mod sweeper;

pub use discount::{DiscountBreakdown, Recalculation};
pub use engine::{CartLine, Validation, ValidationContext, ValidationOptions};
pub use ledger::{CommitData, LedgerError, LedgerResult};
