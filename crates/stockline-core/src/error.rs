//! # Error Types
//!
//! Domain-specific error types for stockline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockline-core errors (this file)                                     │
//! │  ├── CheckoutError    - Every failure a checkout request can end in    │
//! │  ├── PaymentFailure   - Why payment verification did not pass          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockline-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  stockline-payments errors (separate crate)                            │
//! │  └── GatewayError     - Payment provider failures                      │
//! │                                                                         │
//! │  CLI errors (in app)                                                   │
//! │  └── ApiError         - What the caller sees ({code, message})         │
//! │                                                                         │
//! │  Flow: DbError / GatewayError → CheckoutError → ApiError               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Messages carry only caller-supplied values, product names and stock
//! 3. Every variant maps to exactly one stable [`ErrorCode`]
//! 4. Storage internals are logged where they happen, never displayed

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Code
// =============================================================================

/// Stable, machine-readable error codes.
///
/// Serialized as SCREAMING_SNAKE_CASE (`"INSUFFICIENT_STOCK"`). Callers match
/// on these; renaming one is a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    InsufficientStock,
    EmptyCart,
    PaymentVerificationFailed,
    DuplicateReference,
    GatewayUnavailable,
    ValidationError,
    StorageError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::EmptyCart => "EMPTY_CART",
            ErrorCode::PaymentVerificationFailed => "PAYMENT_VERIFICATION_FAILED",
            ErrorCode::DuplicateReference => "DUPLICATE_REFERENCE",
            ErrorCode::GatewayUnavailable => "GATEWAY_UNAVAILABLE",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::StorageError => "STORAGE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Entity
// =============================================================================

/// The kind of record a [`CheckoutError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Product,
    CartItem,
    Order,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Product => f.write_str("Product"),
            Entity::CartItem => f.write_str("Cart item for product"),
            Entity::Order => f.write_str("Order"),
        }
    }
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Checkout errors.
///
/// Every operation of the checkout subsystem ends in `Ok` or exactly one of
/// these. All of them are terminal for the request; none is retried
/// automatically.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Record is absent, or belongs to another user.
    ///
    /// ## When This Occurs
    /// - Product id doesn't exist
    /// - Cart line for (user, product) doesn't exist
    /// - Order id / payment reference doesn't exist
    /// - Order exists but is owned by a different user (no cross-user leak)
    #[error("{entity} \"{id}\" not found")]
    NotFound { entity: Entity, id: String },

    /// Requested quantity exceeds current stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: [B qty 2]     stock(B) = 1
    ///      │
    ///      ▼
    /// Re-validate snapshot
    ///      │
    ///      ▼
    /// InsufficientStock { product: "B", available: 1, requested: 2 }
    ///      │
    ///      ▼
    /// Caller sees: Insufficient stock for "B". Available: 1
    /// ```
    #[error("Insufficient stock for \"{product}\". Available: {available}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Checkout was attempted with no cart lines.
    #[error("Cannot checkout with an empty cart")]
    EmptyCart,

    /// The gateway did not confirm the payment.
    #[error("Payment verification failed: {0}")]
    PaymentVerificationFailed(PaymentFailure),

    /// An order with this payment reference already exists.
    #[error("An order with payment reference \"{reference}\" already exists")]
    DuplicateReference { reference: String },

    /// Checkout initiation could not reach the payment gateway.
    #[error("Payment gateway is unavailable")]
    GatewayUnavailable,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Opaque storage failure. `detail` is for logs only.
    #[error("A storage error occurred")]
    Storage { detail: String },
}

impl CheckoutError {
    /// Shorthand for a NotFound error.
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        CheckoutError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CheckoutError::NotFound { .. } => ErrorCode::NotFound,
            CheckoutError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CheckoutError::EmptyCart => ErrorCode::EmptyCart,
            CheckoutError::PaymentVerificationFailed(_) => ErrorCode::PaymentVerificationFailed,
            CheckoutError::DuplicateReference { .. } => ErrorCode::DuplicateReference,
            CheckoutError::GatewayUnavailable => ErrorCode::GatewayUnavailable,
            CheckoutError::Validation(_) => ErrorCode::ValidationError,
            CheckoutError::Storage { .. } => ErrorCode::StorageError,
        }
    }
}

// =============================================================================
// Payment Failure
// =============================================================================

/// Why a verify attempt did not produce a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentFailure {
    /// Gateway answered with a status other than `"success"`.
    Declined { status: String },
    /// Gateway reported a different amount than the order total.
    AmountMismatch { expected: i64, reported: i64 },
    /// Gateway could not be reached while verifying.
    GatewayUnavailable,
    /// Verify did not answer within the configured bound.
    GatewayTimeout,
}

impl fmt::Display for PaymentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentFailure::Declined { status } => write!(f, "payment status is \"{}\"", status),
            PaymentFailure::AmountMismatch { expected, reported } => write!(
                f,
                "amount mismatch (expected {}, gateway reported {})",
                expected, reported
            ),
            PaymentFailure::GatewayUnavailable => f.write_str("payment gateway is unavailable"),
            PaymentFailure::GatewayTimeout => f.write_str("payment gateway timed out"),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any storage or gateway call.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g. malformed email or reference).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CheckoutError.
pub type CoreResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CheckoutError::InsufficientStock {
            product: "B".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(err.to_string(), "Insufficient stock for \"B\". Available: 1");

        assert_eq!(
            CheckoutError::EmptyCart.to_string(),
            "Cannot checkout with an empty cart"
        );

        let err = CheckoutError::not_found(Entity::CartItem, "p-9");
        assert_eq!(err.to_string(), "Cart item for product \"p-9\" not found");
    }

    #[test]
    fn test_storage_detail_not_displayed() {
        let err = CheckoutError::Storage {
            detail: "database is locked".to_string(),
        };
        assert!(!err.to_string().contains("locked"));
        assert_eq!(err.code(), ErrorCode::StorageError);
    }

    #[test]
    fn test_codes_are_stable() {
        let cases = [
            (CheckoutError::not_found(Entity::Order, "o"), "NOT_FOUND"),
            (
                CheckoutError::InsufficientStock {
                    product: "A".into(),
                    available: 0,
                    requested: 1,
                },
                "INSUFFICIENT_STOCK",
            ),
            (CheckoutError::EmptyCart, "EMPTY_CART"),
            (
                CheckoutError::PaymentVerificationFailed(PaymentFailure::GatewayTimeout),
                "PAYMENT_VERIFICATION_FAILED",
            ),
            (
                CheckoutError::DuplicateReference {
                    reference: "r".into(),
                },
                "DUPLICATE_REFERENCE",
            ),
            (CheckoutError::GatewayUnavailable, "GATEWAY_UNAVAILABLE"),
            (
                CheckoutError::Validation(ValidationError::Required {
                    field: "user_id".into(),
                }),
                "VALIDATION_ERROR",
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.code().as_str(), expected);
            let json = serde_json::to_string(&err.code()).unwrap();
            assert_eq!(json, format!("\"{}\"", expected));
        }
    }

    #[test]
    fn test_payment_failure_messages() {
        let err = CheckoutError::PaymentVerificationFailed(PaymentFailure::Declined {
            status: "abandoned".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Payment verification failed: payment status is \"abandoned\""
        );
    }

    #[test]
    fn test_validation_converts_to_checkout_error() {
        let validation_err = ValidationError::Required {
            field: "email".to_string(),
        };
        let err: CheckoutError = validation_err.into();
        assert!(matches!(err, CheckoutError::Validation(_)));
    }
}
