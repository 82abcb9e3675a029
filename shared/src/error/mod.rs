//! Unified error system for the checkout core
//!
//! - [`ErrorCode`]: standardized codes for every rejection the core can emit
//! - [`ErrorCategory`]: classification of codes by domain
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Voucher validation errors
//! - 2xxx: Voucher ledger errors
//! - 3xxx: Order errors
//! - 4xxx: Return errors
//! - 9xxx: System errors
//!
//! Validation rejections are expected outcomes: they travel as values
//! (code + message), never as panics or opaque faults. Only storage and
//! infrastructure failures are true errors.

pub mod category;
pub mod codes;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
