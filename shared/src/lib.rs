//! Shared types for the checkout transactional core
//!
//! Persisted data shapes (vouchers, usage records, orders, return requests,
//! products), the unified error code taxonomy, and small utilities used by
//! every crate that talks to the core.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
