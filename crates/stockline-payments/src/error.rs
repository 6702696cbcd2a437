//! # Gateway Errors
//!
//! ```text
//! reqwest timeout            → Timeout
//! connect / send failure     → Unavailable
//! HTTP 4xx / 5xx             → Rejected { status, message }
//! 2xx with `status: false`   → Rejected { status, message }
//! body not the agreed shape  → InvalidResponse
//! bad base URL / secret      → Configuration
//! ```
//!
//! The adapter reports what happened on the wire. What a failure means for
//! an order is decided by the checkout orchestrator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Payment gateway unreachable: {0}")]
    Unavailable(String),

    #[error("Payment gateway timed out")]
    Timeout,

    #[error("Payment gateway rejected the request. Status {status}. {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected payment gateway response: {0}")]
    InvalidResponse(String),

    #[error("Payment gateway misconfigured: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Whether the provider could not give an answer at all.
    ///
    /// Server-side rejections (5xx) count; a 4xx is a real answer.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Unavailable(_) | GatewayError::Timeout => true,
            GatewayError::Rejected { status, .. } => *status >= 500,
            GatewayError::InvalidResponse(_) | GatewayError::Configuration(_) => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            GatewayError::Configuration(err.to_string())
        } else {
            GatewayError::Unavailable(err.to_string())
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
