//! Unified error codes for the checkout core
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Voucher validation errors
//! - 2xxx: Voucher ledger errors
//! - 3xxx: Order errors
//! - 4xxx: Return errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Permission denied
    PermissionDenied = 5,
    /// Value out of range
    ValueOutOfRange = 6,

    // ==================== 1xxx: Voucher validation ====================
    /// Voucher is not active
    Inactive = 1001,
    /// Voucher validity window has closed
    Expired = 1002,
    /// Voucher validity window has not opened yet
    NotStarted = 1003,
    /// Voucher redemption capacity is exhausted
    OutOfStock = 1004,
    /// Order amount below the voucher minimum
    MinOrderNotMet = 1005,
    /// User is not on the voucher allow-list
    UserNotEligible = 1006,
    /// Voucher is restricted to accounts newer than its start date
    NewUserOnly = 1007,
    /// Voucher is restricted to first-time users
    FirstTimeOnly = 1008,
    /// Per-user redemption cap reached (pending + used records)
    UserLimitExceeded = 1009,
    /// No cart product is on the voucher's applicable list
    ProductNotApplicable = 1010,
    /// A cart product is on the voucher's excluded list
    ProductExcluded = 1011,
    /// No cart product's category is on the applicable list
    CategoryNotApplicable = 1012,
    /// A cart product's category is on the excluded list
    CategoryExcluded = 1013,
    /// Cart quantity below the voucher minimum
    MinQuantityNotMet = 1014,
    /// Cart quantity above the voucher maximum
    MaxQuantityExceeded = 1015,
    /// Voucher cannot stack with the vouchers already applied
    StackingNotAllowed = 1016,
    /// Voucher conflicts with an already-applied voucher of the same kind
    ConflictWithExisting = 1017,

    // ==================== 2xxx: Voucher ledger ====================
    /// Usage record was already committed
    AlreadyCommitted = 2001,
    /// Usage record is already in a terminal state (double-rollback)
    AlreadyTerminal = 2002,
    /// Conditional update lost a race and no retry is safe here
    ConcurrencyError = 2003,

    // ==================== 3xxx: Order ====================
    /// Order not found
    OrderNotFound = 3001,
    /// Requested status transition is not allowed
    InvalidTransition = 3002,
    /// Order can no longer be cancelled
    NotCancellable = 3003,
    /// A line item has insufficient stock
    InsufficientStock = 3004,

    // ==================== 4xxx: Return ====================
    /// Order is not in delivered status
    OrderNotDelivered = 4001,
    /// Post-delivery return window has closed
    ReturnWindowExpired = 4002,
    /// A non-terminal return request already exists for the order
    ReturnAlreadyOpen = 4003,
    /// Return quantity exceeds the purchased quantity
    ReturnQuantityExceeded = 4004,

    // ==================== 9xxx: System ====================
    /// Internal error
    SystemError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Check if this is an expected validation outcome (vs. a true fault)
    #[inline]
    pub const fn is_validation(&self) -> bool {
        let code = self.code();
        code < 9000 && !self.is_success()
    }

    /// The SCREAMING_SNAKE name this code is logged and surfaced under
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Success => "SUCCESS",
            ErrorCode::Unknown => "UNKNOWN",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::ValueOutOfRange => "VALUE_OUT_OF_RANGE",

            ErrorCode::Inactive => "INACTIVE",
            ErrorCode::Expired => "EXPIRED",
            ErrorCode::NotStarted => "NOT_STARTED",
            ErrorCode::OutOfStock => "OUT_OF_STOCK",
            ErrorCode::MinOrderNotMet => "MIN_ORDER_NOT_MET",
            ErrorCode::UserNotEligible => "USER_NOT_ELIGIBLE",
            ErrorCode::NewUserOnly => "NEW_USER_ONLY",
            ErrorCode::FirstTimeOnly => "FIRST_TIME_ONLY",
            ErrorCode::UserLimitExceeded => "USER_LIMIT_EXCEEDED",
            ErrorCode::ProductNotApplicable => "PRODUCT_NOT_APPLICABLE",
            ErrorCode::ProductExcluded => "PRODUCT_EXCLUDED",
            ErrorCode::CategoryNotApplicable => "CATEGORY_NOT_APPLICABLE",
            ErrorCode::CategoryExcluded => "CATEGORY_EXCLUDED",
            ErrorCode::MinQuantityNotMet => "MIN_QUANTITY_NOT_MET",
            ErrorCode::MaxQuantityExceeded => "MAX_QUANTITY_EXCEEDED",
            ErrorCode::StackingNotAllowed => "STACKING_NOT_ALLOWED",
            ErrorCode::ConflictWithExisting => "CONFLICT_WITH_EXISTING",

            ErrorCode::AlreadyCommitted => "ALREADY_COMMITTED",
            ErrorCode::AlreadyTerminal => "ALREADY_TERMINAL",
            ErrorCode::ConcurrencyError => "CONCURRENCY_ERROR",

            ErrorCode::OrderNotFound => "ORDER_NOT_FOUND",
            ErrorCode::InvalidTransition => "INVALID_TRANSITION",
            ErrorCode::NotCancellable => "NOT_CANCELLABLE",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",

            ErrorCode::OrderNotDelivered => "ORDER_NOT_DELIVERED",
            ErrorCode::ReturnWindowExpired => "RETURN_WINDOW_EXPIRED",
            ErrorCode::ReturnAlreadyOpen => "RETURN_ALREADY_OPEN",
            ErrorCode::ReturnQuantityExceeded => "RETURN_QUANTITY_EXCEEDED",

            ErrorCode::SystemError => "SYSTEM_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
        }
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            ErrorCode::Inactive => "Voucher is not active",
            ErrorCode::Expired => "Voucher has expired",
            ErrorCode::NotStarted => "Voucher is not yet valid",
            ErrorCode::OutOfStock => "Voucher has been fully redeemed",
            ErrorCode::MinOrderNotMet => "Order amount is below the voucher minimum",
            ErrorCode::UserNotEligible => "User is not eligible for this voucher",
            ErrorCode::NewUserOnly => "Voucher is limited to new users",
            ErrorCode::FirstTimeOnly => "Voucher is limited to first-time use",
            ErrorCode::UserLimitExceeded => "Per-user voucher limit reached",
            ErrorCode::ProductNotApplicable => "Voucher does not apply to these products",
            ErrorCode::ProductExcluded => "Cart contains a product excluded from this voucher",
            ErrorCode::CategoryNotApplicable => "Voucher does not apply to these categories",
            ErrorCode::CategoryExcluded => "Cart contains a category excluded from this voucher",
            ErrorCode::MinQuantityNotMet => "Cart quantity is below the voucher minimum",
            ErrorCode::MaxQuantityExceeded => "Cart quantity is above the voucher maximum",
            ErrorCode::StackingNotAllowed => "Voucher cannot be combined with others",
            ErrorCode::ConflictWithExisting => "Voucher conflicts with an applied voucher",

            ErrorCode::AlreadyCommitted => "Usage record was already committed",
            ErrorCode::AlreadyTerminal => "Usage record is already terminal",
            ErrorCode::ConcurrencyError => "Concurrent update conflict",

            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidTransition => "Status transition is not allowed",
            ErrorCode::NotCancellable => "Order can no longer be cancelled",
            ErrorCode::InsufficientStock => "Insufficient stock",

            ErrorCode::OrderNotDelivered => "Order has not been delivered",
            ErrorCode::ReturnWindowExpired => "Return window has closed",
            ErrorCode::ReturnAlreadyOpen => "A return request is already open for this order",
            ErrorCode::ReturnQuantityExceeded => "Return quantity exceeds purchased quantity",

            ErrorCode::SystemError => "Internal error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

/// Error type for invalid u16 → ErrorCode conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::PermissionDenied),
            6 => Ok(ErrorCode::ValueOutOfRange),

            // Voucher validation
            1001 => Ok(ErrorCode::Inactive),
            1002 => Ok(ErrorCode::Expired),
            1003 => Ok(ErrorCode::NotStarted),
            1004 => Ok(ErrorCode::OutOfStock),
            1005 => Ok(ErrorCode::MinOrderNotMet),
            1006 => Ok(ErrorCode::UserNotEligible),
            1007 => Ok(ErrorCode::NewUserOnly),
            1008 => Ok(ErrorCode::FirstTimeOnly),
            1009 => Ok(ErrorCode::UserLimitExceeded),
            1010 => Ok(ErrorCode::ProductNotApplicable),
            1011 => Ok(ErrorCode::ProductExcluded),
            1012 => Ok(ErrorCode::CategoryNotApplicable),
            1013 => Ok(ErrorCode::CategoryExcluded),
            1014 => Ok(ErrorCode::MinQuantityNotMet),
            1015 => Ok(ErrorCode::MaxQuantityExceeded),
            1016 => Ok(ErrorCode::StackingNotAllowed),
            1017 => Ok(ErrorCode::ConflictWithExisting),

            // Ledger
            2001 => Ok(ErrorCode::AlreadyCommitted),
            2002 => Ok(ErrorCode::AlreadyTerminal),
            2003 => Ok(ErrorCode::ConcurrencyError),

            // Order
            3001 => Ok(ErrorCode::OrderNotFound),
            3002 => Ok(ErrorCode::InvalidTransition),
            3003 => Ok(ErrorCode::NotCancellable),
            3004 => Ok(ErrorCode::InsufficientStock),

            // Return
            4001 => Ok(ErrorCode::OrderNotDelivered),
            4002 => Ok(ErrorCode::ReturnWindowExpired),
            4003 => Ok(ErrorCode::ReturnAlreadyOpen),
            4004 => Ok(ErrorCode::ReturnQuantityExceeded),

            // System
            9001 => Ok(ErrorCode::SystemError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::Inactive.code(), 1001);
        assert_eq!(ErrorCode::OutOfStock.code(), 1004);
        assert_eq!(ErrorCode::ConflictWithExisting.code(), 1017);
        assert_eq!(ErrorCode::AlreadyCommitted.code(), 2001);
        assert_eq!(ErrorCode::OrderNotFound.code(), 3001);
        assert_eq!(ErrorCode::ReturnWindowExpired.code(), 4002);
        assert_eq!(ErrorCode::SystemError.code(), 9001);
    }

    #[test]
    fn test_as_str_matches_platform_names() {
        assert_eq!(ErrorCode::NotFound.as_str(), "NOT_FOUND");
        assert_eq!(ErrorCode::OutOfStock.as_str(), "OUT_OF_STOCK");
        assert_eq!(ErrorCode::FirstTimeOnly.as_str(), "FIRST_TIME_ONLY");
        assert_eq!(ErrorCode::StackingNotAllowed.as_str(), "STACKING_NOT_ALLOWED");
        assert_eq!(ErrorCode::ConcurrencyError.as_str(), "CONCURRENCY_ERROR");
        assert_eq!(ErrorCode::SystemError.as_str(), "SYSTEM_ERROR");
    }

    #[test]
    fn test_is_validation() {
        assert!(ErrorCode::MinOrderNotMet.is_validation());
        assert!(ErrorCode::OutOfStock.is_validation());
        assert!(!ErrorCode::Success.is_validation());
        assert!(!ErrorCode::DatabaseError.is_validation());
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(1004), Ok(ErrorCode::OutOfStock));
        assert_eq!(ErrorCode::try_from(2002), Ok(ErrorCode::AlreadyTerminal));
        assert_eq!(ErrorCode::try_from(9002), Ok(ErrorCode::DatabaseError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(5001), Err(InvalidErrorCode(5001)));
    }

    #[test]
    fn test_serialize_as_u16() {
        let json = serde_json::to_string(&ErrorCode::OutOfStock).unwrap();
        assert_eq!(json, "1004");

        let code: ErrorCode = serde_json::from_str("3001").unwrap();
        assert_eq!(code, ErrorCode::OrderNotFound);

        let result: Result<ErrorCode, _> = serde_json::from_str("10000");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::Success), "0");
        assert_eq!(format!("{}", ErrorCode::OrderNotFound), "3001");
    }
}
