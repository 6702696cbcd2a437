//! The gateway seam and the values that cross it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;

/// Everything needed to open a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiateRequest {
    /// Amount in minor units.
    pub amount: i64,
    /// Payer contact, forwarded to the provider.
    pub email: String,
    /// Caller-generated, unique per attempt.
    pub reference: String,
    /// Echoed back in provider metadata for correlation.
    pub user_id: String,
    pub line_count: usize,
}

/// Where to send the payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// The provider's answer to "did this reference get paid?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerification {
    /// True only for an exact `"success"` status.
    pub succeeded: bool,
    /// Status string as the provider sent it.
    pub raw_status: String,
    pub reference: String,
    /// Amount the provider collected, minor units, if reported.
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

/// A payment provider.
///
/// Implementations are treated as unreliable and at-least-once: `verify`
/// may be called many times for the same reference and must not have side
/// effects at the provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment intent for `request.reference`.
    async fn initiate(&self, request: &InitiateRequest) -> GatewayResult<PaymentIntent>;

    /// Asks the provider whether `reference` has been paid.
    async fn verify(&self, reference: &str) -> GatewayResult<PaymentVerification>;
}
