//! # Error Types
//!
//! Domain-specific error types for ludo-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ludo-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule rejections                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ludo-store errors (separate crate)                                    │
//! │  └── StoreError       - Storage failures + stock-race conflicts        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → UI shell             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, amounts, etc.)
//! 3. Errors are enum variants, never String
//! 4. Every rejection is a returned value - the UI shows a specific
//!    message per kind without unwinding any state
//! 5. Nothing is ever resolved by silently clamping user input

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule rejections.
///
/// These are expected outcomes of normal operation (a cashier scanning an
/// unknown code, a customer short on cash) and must be displayed, not
/// propagated as panics.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// No product matches a scan payload or reference.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested quantity exceeds what inventory can supply.
    ///
    /// Raised by the cart when an addition (counting what is already in
    /// the cart) would exceed stock. The cart is left untouched.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Tendered amount does not cover the sale total.
    ///
    /// Never auto-clamped: the cashier must collect more or shrink the
    /// cart.
    #[error("Insufficient payment: total {total_cents} cents, tendered {paid_cents} cents")]
    InsufficientPayment { total_cents: i64, paid_cents: i64 },

    /// Quantity is zero, negative, or otherwise unusable.
    #[error("Invalid quantity: {requested}")]
    InvalidQuantity { requested: i64 },

    /// Finalize was called on a cart with no effective lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A scan payload could not be parsed into any known shape.
    ///
    /// Soft failure: the scanner keeps running, the UI shows a brief
    /// "invalid code" message.
    #[error("Unrecognized scan payload: {0}")]
    ScanParseFailure(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "Agua 600 ml".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Agua 600 ml: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "concept".to_string(),
        };
        assert_eq!(err.to_string(), "concept is required");

        let err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        assert_eq!(err.to_string(), "amount must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
