//! # stockline-core: Pure Checkout Logic for Stockline
//!
//! This crate is the **heart** of Stockline checkout. It contains the domain
//! types and every decision that does not need I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockline Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/stockline-cli (boundary)                   │   │
//! │  │    cart add ──► checkout start ──► checkout verify ──► orders   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             stockline-checkout (orchestrator)                   │   │
//! │  └───────────────┬─────────────────────────────────┬───────────────┘   │
//! │                  │                                 │                    │
//! │  ┌───────────────▼───────────────┐   ┌─────────────▼───────────────┐   │
//! │  │   stockline-db (SQLite)       │   │  stockline-payments (HTTP)  │   │
//! │  └───────────────┬───────────────┘   └─────────────┬───────────────┘   │
//! │                  │                                 │                    │
//! │  ┌───────────────▼─────────────────────────────────▼───────────────┐   │
//! │  │            ★ stockline-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ checkout  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │   plan    │  │   rules   │  │   │
//! │  │   │   Order   │  │           │  │   state   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • NO FILE SYSTEM                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, CartLine, Order, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`checkout`] - State machine, snapshot → plan, payment references
//! - [`error`] - Error taxonomy with stable codes
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stockline_core::checkout::plan_from_snapshot;
//! use stockline_core::{CheckoutError, SnapshotLine};
//!
//! let snapshot = vec![SnapshotLine {
//!     product_id: "b".into(),
//!     product_name: "B".into(),
//!     quantity: 2,
//!     unit_price: 100,
//!     stock: 1,
//! }];
//!
//! let err = plan_from_snapshot(&snapshot).unwrap_err();
//! assert!(matches!(err, CheckoutError::InsufficientStock { available: 1, .. }));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use checkout::{CheckoutPlan, CheckoutState};
pub use error::{CheckoutError, CoreResult, Entity, ErrorCode, PaymentFailure, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single cart line.
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length of a caller-supplied user id.
pub const MAX_USER_ID_LEN: usize = 128;

/// Maximum length of a payment reference.
pub const MAX_REFERENCE_LEN: usize = 100;
