//! # Paystack Gateway
//!
//! HTTP implementation of [`PaymentGateway`] against a Paystack-style API.
//!
//! ## Wire Contract
//! ```text
//! POST {base}/transaction/initialize          Authorization: Bearer <secret>
//!   → { email, amount, reference, metadata: { user_id, line_count } }
//!   ← { status, message, data: { authorization_url, access_code, reference } }
//!
//! GET  {base}/transaction/verify/{reference}  Authorization: Bearer <secret>
//!   ← { status, message, data: { status, reference, amount, currency } }
//!
//! `status` (outer) is the API call result; `data.status` (inner) is the
//! payment's. Only `data.status == "success"` means paid.
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{InitiateRequest, PaymentGateway, PaymentIntent, PaymentVerification};
use crate::secret::Secret;
use stockline_core::validation::validate_reference;

const SUCCESS_STATUS: &str = "success";

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings, injected at construction.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API root, e.g. `https://api.paystack.co`. No trailing slash needed.
    pub base_url: String,
    pub secret_key: Secret<String>,
    /// Upper bound on every request, connect included.
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        GatewayConfig {
            base_url: base_url.into(),
            secret_key: Secret::new(secret_key.into()),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: i64,
    reference: &'a str,
    metadata: InitializeMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct InitializeMetadata<'a> {
    user_id: &'a str,
    line_count: usize,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

// =============================================================================
// Gateway
// =============================================================================

#[derive(Debug, Clone)]
pub struct PaystackGateway {
    base_url: String,
    client: Client,
}

impl PaystackGateway {
    /// Builds the HTTP client. Fails on an empty secret or base URL.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        if config.secret_key.is_empty() {
            return Err(GatewayError::Configuration("secret key is empty".to_string()));
        }

        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GatewayError::Configuration("base URL is empty".to_string()));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|_| GatewayError::Configuration("secret key is not a valid header value".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        Ok(PaystackGateway { base_url, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Turns a response into the envelope's `data`, or a typed error.
    async fn read_envelope<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = response.json::<Envelope<T>>().await?;

        if !envelope.status {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: envelope.message,
            });
        }

        envelope
            .data
            .ok_or_else(|| GatewayError::InvalidResponse("response has no data".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initiate(&self, request: &InitiateRequest) -> GatewayResult<PaymentIntent> {
        debug!(reference = %request.reference, amount = request.amount, "Initializing transaction");

        let body = InitializeBody {
            email: &request.email,
            amount: request.amount,
            reference: &request.reference,
            metadata: InitializeMetadata {
                user_id: &request.user_id,
                line_count: request.line_count,
            },
        };

        let response = self
            .client
            .post(self.url("/transaction/initialize"))
            .json(&body)
            .send()
            .await?;

        let data: InitializeData = Self::read_envelope(response).await?;

        info!(reference = %data.reference, "Transaction initialized");
        Ok(PaymentIntent {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify(&self, reference: &str) -> GatewayResult<PaymentVerification> {
        // The reference becomes a path segment.
        validate_reference(reference)
            .map_err(|e| GatewayError::Configuration(format!("unusable reference: {e}")))?;

        debug!(reference = %reference, "Verifying transaction");

        let response = self
            .client
            .get(self.url(&format!("/transaction/verify/{reference}")))
            .send()
            .await?;

        let data: VerifyData = Self::read_envelope(response).await?;
        let succeeded = data.status == SUCCESS_STATUS;

        if succeeded {
            info!(reference = %reference, amount = ?data.amount, "Payment confirmed");
        } else {
            warn!(reference = %reference, status = %data.status, "Payment not successful");
        }

        Ok(PaymentVerification {
            succeeded,
            raw_status: data.status,
            reference: data.reference.unwrap_or_else(|| reference.to_string()),
            amount: data.amount,
            currency: data.currency,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
