//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutError (stockline-core) ← Stable code, safe message            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in CLI) ← {code, message} JSON                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use stockline_core::{CheckoutError, Entity, ValidationError};
use thiserror::Error;
use tracing::error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and caller feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Product id doesn't exist
    /// - No cart line for (user, product)
    /// - Order id doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    /// Conditional stock decrement affected no row because stock was short.
    ///
    /// ## When This Occurs
    /// - A concurrent checkout took the stock first
    /// - Cart add/update asks for more than is on hand
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting an order whose payment reference already exists
    /// - Inserting a product with an existing id
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// The cart no longer matches the plan being committed.
    ///
    /// ## When This Occurs
    /// - Another checkout consumed the same cart first
    /// - A line was edited or removed between snapshot and commit
    #[error("Cart for {user_id} changed during checkout")]
    CartChanged { user_id: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Cart line referencing a product id that doesn't exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Input rejected before reaching SQLite.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction could not begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether this is a unique violation on the given column.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.ends_with(column))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::RowNotFound    → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::RowNotFound => DbError::QueryFailed("expected a row, found none".to_string()),

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Maps storage failures onto the checkout taxonomy.
///
/// ```text
/// NotFound                                → NOT_FOUND
/// InsufficientStock                       → INSUFFICIENT_STOCK
/// CartChanged                             → EMPTY_CART
/// UniqueViolation(orders.payment_reference) → DUPLICATE_REFERENCE
/// Validation                              → VALIDATION_ERROR
/// anything else                           → STORAGE_ERROR (logged here)
/// ```
impl From<DbError> for CheckoutError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CheckoutError::NotFound { entity, id },
            DbError::InsufficientStock {
                product,
                available,
                requested,
            } => CheckoutError::InsufficientStock {
                product,
                available,
                requested,
            },
            DbError::CartChanged { .. } => CheckoutError::EmptyCart,
            DbError::UniqueViolation { ref field, ref value } if field.ends_with("payment_reference") => {
                CheckoutError::DuplicateReference {
                    reference: value.clone(),
                }
            }
            DbError::Validation(e) => CheckoutError::Validation(e),
            other => {
                error!(error = %other, "Storage failure");
                CheckoutError::Storage {
                    detail: other.to_string(),
                }
            }
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use stockline_core::ErrorCode;

    #[test]
    fn test_duplicate_reference_maps_to_checkout_code() {
        let err: CheckoutError = DbError::duplicate("payment_reference", "order_1_abc_00").into();
        assert_eq!(err.code(), ErrorCode::DuplicateReference);
        assert!(err.to_string().contains("order_1_abc_00"));
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let err: CheckoutError = DbError::QueryFailed("no such table: orders".to_string()).into();
        assert_eq!(err.code(), ErrorCode::StorageError);
        assert!(!err.to_string().contains("orders"));
    }

    #[test]
    fn test_other_unique_violation_is_storage() {
        let err: CheckoutError = DbError::duplicate("products.id", "p-1").into();
        assert_eq!(err.code(), ErrorCode::StorageError);
    }

    #[test]
    fn test_cart_changed_maps_to_empty_cart() {
        let err: CheckoutError = DbError::CartChanged { user_id: "u1".to_string() }.into();
        assert_eq!(err.code(), ErrorCode::EmptyCart);
    }

    #[test]
    fn test_row_not_found_is_query_failure() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::QueryFailed(_)));

        let err: CheckoutError = err.into();
        assert_eq!(err.code(), ErrorCode::StorageError);
    }

    #[test]
    fn test_is_unique_violation_on() {
        let err = DbError::duplicate("orders.payment_reference", "r");
        assert!(err.is_unique_violation_on("payment_reference"));
        assert!(!err.is_unique_violation_on("id"));
    }
}
