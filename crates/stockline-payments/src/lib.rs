//! # stockline-payments: Payment Gateway Adapter
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stockline-checkout                                                     │
//! │       │  Arc<dyn PaymentGateway>                                        │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              stockline-payments (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   gateway.rs   PaymentGateway trait + request/response values   │   │
//! │  │   paystack.rs  reqwest implementation, wire types               │   │
//! │  │   secret.rs    Secret<T> (prints ****)                          │   │
//! │  │   error.rs     GatewayError                                     │   │
//! │  └──────────────────────────────┬──────────────────────────────────┘   │
//! │                                 │ HTTPS                                 │
//! │                                 ▼                                       │
//! │                        Payment provider API                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gateway is an unreliable, at-least-once oracle: it may be slow, it may
//! be down, and the same reference may be verified any number of times.
//! Transport failures are reported as such and never as a declined payment.

pub mod error;
pub mod gateway;
pub mod paystack;
pub mod secret;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{InitiateRequest, PaymentGateway, PaymentIntent, PaymentVerification};
pub use paystack::{GatewayConfig, PaystackGateway};
pub use secret::Secret;
