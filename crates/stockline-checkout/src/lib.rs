//! # stockline-checkout: Checkout Orchestrator
//!
//! Turns a user's cart into exactly one paid order.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apps/stockline-cli                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              stockline-checkout (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   CheckoutService                                               │   │
//! │  │     initiate_checkout    snapshot → plan → gateway.initiate     │   │
//! │  │     verify_and_complete  gateway.verify → plan → atomic commit  │   │
//! │  │     checkout_now         plan → atomic commit                   │   │
//! │  │     orders / order       owner-scoped reads                     │   │
//! │  └───────────────┬─────────────────────────────┬───────────────────┘   │
//! │                  ▼                             ▼                        │
//! │          stockline-db                  stockline-payments               │
//! │    (snapshot, ledger, orders)       (Arc<dyn PaymentGateway>)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - Stock never goes negative, however many checkouts race for it
//! - One payment reference produces at most one order
//! - A failed or unconfirmed payment leaves stock, cart and orders untouched
//! - Order lines keep the name and price they had at checkout
//!
//! Every error is a [`stockline_core::CheckoutError`] carrying a stable code.

pub mod service;

pub use service::{CheckoutResult, CheckoutService, CheckoutSettings};
