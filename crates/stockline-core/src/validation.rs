//! # Validation Module
//!
//! Input validation utilities for Stockline.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request boundary (CLI)                                       │
//! │  ├── Type validation (argument parsing)                                │
//! │  └── THIS MODULE: user id, email, reference                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repositories (stockline-db)                                  │
//! │  └── THIS MODULE: quantity, price, stock before any write              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (quantity >= 1)                         │
//! │  ├── UNIQUE (user_id, product_id), UNIQUE (payment_reference)          │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockline_core::validation::{validate_user_id, validate_quantity};
//!
//! validate_user_id("user-42").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_REFERENCE_LEN, MAX_USER_ID_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identity Validators
// =============================================================================

/// Validates a caller-supplied user id.
///
/// The id is opaque: any non-blank string up to [`MAX_USER_ID_LEN`]
/// characters is accepted. It is not authenticated here.
///
/// ## Example
/// ```rust
/// use stockline_core::validation::validate_user_id;
///
/// assert!(validate_user_id("665f1c2ab3").is_ok());
/// assert!(validate_user_id("  ").is_err());
/// ```
pub fn validate_user_id(user_id: &str) -> ValidationResult<()> {
    if user_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "user_id".to_string(),
        });
    }

    if user_id.chars().count() > MAX_USER_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "user_id".to_string(),
            max: MAX_USER_ID_LEN,
        });
    }

    Ok(())
}

/// Validates a payer email address.
///
/// ## Rules
/// - Must not be empty
/// - Exactly one `@`, with a non-empty local part and a dotted domain
/// - No whitespace
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@example.com".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    match domain.split_once('.') {
        Some((head, tail)) if !head.is_empty() && !tail.is_empty() && !domain.ends_with('.') => Ok(()),
        _ => Err(invalid()),
    }
}

/// Validates a payment reference.
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_REFERENCE_LEN`] characters
/// - Only letters, digits, `-`, `_`, `.` and `=` (safe as a URL path segment)
pub fn validate_reference(reference: &str) -> ValidationResult<()> {
    if reference.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "reference".to_string(),
        });
    }

    if reference.len() > MAX_REFERENCE_LEN {
        return Err(ValidationError::TooLong {
            field: "reference".to_string(),
            max: MAX_REFERENCE_LEN,
        });
    }

    if !reference
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '='))
    {
        return Err(ValidationError::InvalidFormat {
            field: "reference".to_string(),
            reason: "must contain only letters, numbers, '-', '_', '.' and '='".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a unit price in minor units. Zero is allowed.
pub fn validate_price(minor: i64) -> ValidationResult<()> {
    if minor < 0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates an absolute stock level.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Line                                                         │
/// │                                                                         │
/// │  Caller sends quantity: 5                                              │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty < 1 or qty > 999? → VALIDATION_ERROR                     │
/// │       │                                                                 │
/// │       └── OK → stock check in the cart repository                      │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id("u1").is_ok());
        assert!(validate_user_id(&"x".repeat(MAX_USER_ID_LEN)).is_ok());

        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("   ").is_err());
        assert!(validate_user_id(&"x".repeat(MAX_USER_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("a.b+tag@mail.example.org").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada@localhost").is_err());
        assert!(validate_email("ada@example.").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("order_1718000000000_abc123_0f3a9c1d").is_ok());

        assert!(validate_reference("").is_err());
        assert!(validate_reference("../etc/passwd").is_err());
        assert!(validate_reference("has space").is_err());
        assert!(validate_reference(&"r".repeat(MAX_REFERENCE_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Desk Lamp").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price(0).is_ok());
        assert!(validate_price(1099).is_ok());
        assert!(validate_price(-1).is_err());

        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-5).is_err());
    }
}
