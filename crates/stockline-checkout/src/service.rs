//! # Checkout Service
//!
//! ## Verify-and-Complete Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  verify_and_complete(user, reference)                                   │
//! │                                                                         │
//! │  1. Order with this reference?                                         │
//! │       ├── yes, same user   → return it (no side effects)               │
//! │       └── yes, other user  → NOT_FOUND                                 │
//! │  2. gateway.verify(reference)   (bounded by verify_timeout)            │
//! │       └── not "success" / timeout / unreachable                        │
//! │                            → PAYMENT_VERIFICATION_FAILED, no writes    │
//! │  3. Fresh cart snapshot                                                │
//! │       └── empty → order appeared meanwhile? return it : EMPTY_CART     │
//! │  4. plan_from_snapshot: qty ≤ stock for every line, freeze, total      │
//! │  5. reported amount == total (when reconcile_amount)                   │
//! │  6. ATOMIC: insert order, decrement per line, consume planned lines    │
//! │       └── DUPLICATE_REFERENCE or cart already consumed                 │
//! │             → concurrent twin won? return its order : error            │
//! │  7. Completed order                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `checkout_now` runs steps 3, 4, 6 and 7 with a self-generated reference.
//! `initiate_checkout` runs steps 3 and 4, then opens a payment intent.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use stockline_core::checkout::{new_payment_reference, plan_from_snapshot, reconcile_amount};
use stockline_core::validation::{validate_email, validate_reference, validate_user_id};
use stockline_core::{
    CheckoutError, CheckoutPlan, CheckoutSession, CheckoutState, Entity, Order, PaymentFailure,
};
use stockline_db::Database;
use stockline_payments::{GatewayError, InitiateRequest, PaymentGateway, PaymentVerification};

/// Result type for orchestrator operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Settings
// =============================================================================

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Reject a verified payment whose reported amount differs from the
    /// freshly computed order total.
    pub reconcile_amount: bool,
    /// Upper bound on a single gateway verify call.
    pub verify_timeout: Duration,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            reconcile_amount: true,
            verify_timeout: Duration::from_secs(15),
        }
    }
}

// =============================================================================
// Attempt
// =============================================================================

/// One checkout attempt moving through [`CheckoutState`].
struct Attempt<'a> {
    user_id: &'a str,
    reference: &'a str,
    state: CheckoutState,
}

impl<'a> Attempt<'a> {
    fn start(user_id: &'a str, reference: &'a str, state: CheckoutState) -> Self {
        debug!(user_id = %user_id, reference = %reference, state = %state, "Checkout attempt started");
        Attempt {
            user_id,
            reference,
            state,
        }
    }

    fn advance(&mut self, next: CheckoutState) {
        debug_assert!(self.state.can_transition_to(next), "{} -> {}", self.state, next);
        debug!(
            user_id = %self.user_id,
            reference = %self.reference,
            from = %self.state,
            state = %next,
            "Checkout state change"
        );
        self.state = next;
    }

    /// Records the rejection and hands the error back for `return Err(..)`.
    fn reject(&mut self, err: CheckoutError) -> CheckoutError {
        self.state = CheckoutState::Rejected(err.code());
        warn!(
            user_id = %self.user_id,
            reference = %self.reference,
            state = %self.state,
            error = %err,
            "Checkout rejected"
        );
        err
    }
}

// =============================================================================
// Service
// =============================================================================

/// The checkout orchestrator.
///
/// Holds no per-request state; clones share the pool and the gateway, so one
/// instance can serve any number of concurrent tasks.
#[derive(Clone)]
pub struct CheckoutService {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
}

impl CheckoutService {
    pub fn new(db: Database, gateway: Arc<dyn PaymentGateway>) -> Self {
        CheckoutService {
            db,
            gateway,
            settings: CheckoutSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CheckoutSettings) -> Self {
        self.settings = settings;
        self
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Validates the cart and opens a payment intent for its total.
    ///
    /// Writes nothing. An empty cart fails before the gateway is contacted.
    pub async fn initiate_checkout(&self, user_id: &str, email: &str) -> CheckoutResult<CheckoutSession> {
        validate_user_id(user_id)?;
        validate_email(email)?;

        let reference = new_payment_reference(user_id);
        let mut attempt = Attempt::start(user_id, &reference, CheckoutState::Initiated);

        let plan = self.load_plan(user_id).await.map_err(|e| attempt.reject(e))?;

        let request = InitiateRequest {
            amount: plan.total_amount(),
            email: email.trim().to_string(),
            reference: reference.clone(),
            user_id: user_id.to_string(),
            line_count: plan.line_count(),
        };

        let intent = match self.gateway.initiate(&request).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(user_id = %user_id, reference = %reference, error = %e, "Gateway initiate failed");
                return Err(attempt.reject(CheckoutError::GatewayUnavailable));
            }
        };

        attempt.advance(CheckoutState::AwaitingPayment);
        info!(
            user_id = %user_id,
            reference = %intent.reference,
            amount = plan.total_amount(),
            "Checkout initiated"
        );

        Ok(CheckoutSession {
            authorization_url: intent.authorization_url,
            access_code: intent.access_code,
            reference: intent.reference,
            amount: plan.total_amount(),
        })
    }

    /// Confirms payment for `reference` and turns the cart into an order.
    ///
    /// Safe to call any number of times: once an order exists for the
    /// reference, later calls by the same user return it unchanged.
    pub async fn verify_and_complete(&self, user_id: &str, reference: &str) -> CheckoutResult<Order> {
        validate_user_id(user_id)?;
        validate_reference(reference)?;

        let mut attempt = Attempt::start(user_id, reference, CheckoutState::AwaitingPayment);

        if let Some(order) = self.find_owned(user_id, reference).await.map_err(|e| attempt.reject(e))? {
            info!(user_id = %user_id, reference = %reference, order_id = %order.id, "Reference already completed");
            return Ok(order);
        }

        attempt.advance(CheckoutState::Verifying);

        let verification = self
            .verify_payment(reference)
            .await
            .map_err(|failure| attempt.reject(CheckoutError::PaymentVerificationFailed(failure)))?;

        let plan = match self.load_plan(user_id).await {
            Ok(plan) => plan,
            Err(CheckoutError::EmptyCart) => {
                // A concurrent delivery of the same callback may have just
                // committed and cleared the cart.
                if let Some(order) = self.find_owned(user_id, reference).await.map_err(|e| attempt.reject(e))? {
                    info!(user_id = %user_id, reference = %reference, "Completed by concurrent delivery");
                    return Ok(order);
                }
                return Err(attempt.reject(CheckoutError::EmptyCart));
            }
            Err(e) => return Err(attempt.reject(e)),
        };

        if self.settings.reconcile_amount {
            reconcile_amount(&plan, verification.amount)
                .map_err(|failure| attempt.reject(CheckoutError::PaymentVerificationFailed(failure)))?;
        }

        let order = self.commit_plan(user_id, reference, &plan).await.map_err(|e| attempt.reject(e))?;
        attempt.advance(CheckoutState::Completed);

        Ok(order)
    }

    /// Immediate checkout without a payment step.
    ///
    /// Generates its own reference so the order carries the same uniqueness
    /// key as gateway-backed ones.
    pub async fn checkout_now(&self, user_id: &str) -> CheckoutResult<Order> {
        validate_user_id(user_id)?;

        let reference = new_payment_reference(user_id);
        let mut attempt = Attempt::start(user_id, &reference, CheckoutState::Initiated);
        attempt.advance(CheckoutState::Verifying);

        let plan = self.load_plan(user_id).await.map_err(|e| attempt.reject(e))?;
        let order = self
            .commit_plan(user_id, &reference, &plan)
            .await
            .map_err(|e| attempt.reject(e))?;

        attempt.advance(CheckoutState::Completed);
        Ok(order)
    }

    /// The user's orders, newest first.
    pub async fn orders(&self, user_id: &str) -> CheckoutResult<Vec<Order>> {
        validate_user_id(user_id)?;
        Ok(self.db.orders().find_by_user(user_id).await?)
    }

    /// One order. NotFound when absent or owned by someone else.
    pub async fn order(&self, user_id: &str, order_id: &str) -> CheckoutResult<Order> {
        validate_user_id(user_id)?;

        match self.db.orders().find_by_id(order_id).await? {
            Some(order) if order.is_owned_by(user_id) => Ok(order),
            _ => Err(CheckoutError::not_found(Entity::Order, order_id)),
        }
    }

    // =========================================================================
    // Shared Steps
    // =========================================================================

    /// Fresh snapshot → validated plan.
    async fn load_plan(&self, user_id: &str) -> CheckoutResult<CheckoutPlan> {
        let snapshot = self.db.carts().snapshot(user_id).await?;
        plan_from_snapshot(&snapshot)
    }

    /// The atomic section, plus recovery when a concurrent twin already
    /// committed the same reference.
    ///
    /// A twin shows up either as a duplicate reference or as a cart that was
    /// consumed under us. Any other checkout that consumed the cart leaves
    /// no order for this reference, so the error stands.
    async fn commit_plan(&self, user_id: &str, reference: &str, plan: &CheckoutPlan) -> CheckoutResult<Order> {
        match self.db.checkout().commit(user_id, reference, plan).await {
            Ok(order) => Ok(order),
            Err(e) => match CheckoutError::from(e) {
                err @ (CheckoutError::DuplicateReference { .. } | CheckoutError::EmptyCart) => {
                    match self.find_owned(user_id, reference).await? {
                        Some(order) => {
                            info!(user_id = %user_id, reference = %reference, "Duplicate delivery resolved to existing order");
                            Ok(order)
                        }
                        None => Err(err),
                    }
                }
                other => Err(other),
            },
        }
    }

    /// Looks up an order by reference, hiding other users' orders.
    async fn find_owned(&self, user_id: &str, reference: &str) -> CheckoutResult<Option<Order>> {
        match self.db.orders().find_by_reference(reference).await? {
            Some(order) if order.is_owned_by(user_id) => Ok(Some(order)),
            Some(_) => {
                warn!(user_id = %user_id, reference = %reference, "Reference belongs to another user");
                Err(CheckoutError::not_found(Entity::Order, reference))
            }
            None => Ok(None),
        }
    }

    /// Calls the gateway and reduces every non-confirmation to a
    /// [`PaymentFailure`].
    async fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, PaymentFailure> {
        let outcome = tokio::time::timeout(self.settings.verify_timeout, self.gateway.verify(reference)).await;

        match outcome {
            Err(_elapsed) => Err(PaymentFailure::GatewayTimeout),
            Ok(Err(GatewayError::Timeout)) => Err(PaymentFailure::GatewayTimeout),
            Ok(Err(e)) if e.is_transient() => {
                warn!(reference = %reference, error = %e, "Gateway could not answer verify");
                Err(PaymentFailure::GatewayUnavailable)
            }
            Ok(Err(GatewayError::Rejected { status, message })) => {
                warn!(reference = %reference, status = status, message = %message, "Gateway refused verify");
                Err(PaymentFailure::Declined {
                    status: format!("rejected ({status})"),
                })
            }
            Ok(Err(e)) => {
                warn!(reference = %reference, error = %e, "Gateway verify failed");
                Err(PaymentFailure::GatewayUnavailable)
            }
            Ok(Ok(verification)) if verification.succeeded => Ok(verification),
            Ok(Ok(verification)) => Err(PaymentFailure::Declined {
                status: verification.raw_status,
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
