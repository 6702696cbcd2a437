//! # API Error Type
//!
//! What a caller sees when a command fails.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbError ──► CheckoutError ──┐                                          │
//! │                              ├──► ApiError { code, message } ──► stderr │
//! │  ConfigError / GatewayError ─┘                                          │
//! │                                                                         │
//! │  {"code": "INSUFFICIENT_STOCK",                                         │
//! │   "message": "Insufficient stock for \"B\". Available: 1"}             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage internals are logged, never printed.

use std::fmt;

use serde::Serialize;

use stockline_core::{CheckoutError, ErrorCode, ValidationError};
use stockline_db::DbError;
use stockline_payments::GatewayError;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Stable machine-readable code.
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Opaque failure; `detail` goes to the log only.
    pub fn internal(detail: impl fmt::Display) -> Self {
        tracing::error!(error = %detail, "Internal failure");
        ApiError::new(ErrorCode::StorageError, "An internal error occurred")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!(r#"{{"code":"{}","message":"{}"}}"#, self.code, self.code))
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::new(err.code(), err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        CheckoutError::from(err).into()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::from(err).into()
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ValidationError, err.to_string())
    }
}

/// Gateway setup failures are bad settings; anything else means the
/// provider could not be used.
impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Configuration(_) => ApiError::new(ErrorCode::ValidationError, err.to_string()),
            other => {
                tracing::warn!(error = %other, "Gateway setup failed");
                CheckoutError::GatewayUnavailable.into()
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
