//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Voucher validation errors
/// - 2xxx: Voucher ledger errors
/// - 3xxx: Order errors
/// - 4xxx: Return errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Voucher validation errors (1xxx)
    Voucher,
    /// Voucher ledger errors (2xxx)
    Ledger,
    /// Order errors (3xxx)
    Order,
    /// Return errors (4xxx)
    Return,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Voucher,
            2000..3000 => Self::Ledger,
            3000..4000 => Self::Order,
            4000..5000 => Self::Return,
            _ => Self::System,
        }
    }
}

impl From<ErrorCode> for ErrorCategory {
    fn from(code: ErrorCode) -> Self {
        Self::from_code(code.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ranges() {
        assert_eq!(ErrorCategory::from_code(3), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1004), ErrorCategory::Voucher);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Ledger);
        assert_eq!(ErrorCategory::from_code(3002), ErrorCategory::Order);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Return);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
    }

    #[test]
    fn test_from_error_code() {
        assert_eq!(
            ErrorCategory::from(ErrorCode::OutOfStock),
            ErrorCategory::Voucher
        );
        assert_eq!(
            ErrorCategory::from(ErrorCode::AlreadyTerminal),
            ErrorCategory::Ledger
        );
    }
}
