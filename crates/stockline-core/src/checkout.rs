//! # Checkout Module
//!
//! The pure half of checkout: the state machine, turning a cart snapshot
//! into a validated [`CheckoutPlan`], and payment reference generation.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Initiated ──► AwaitingPayment ──► Verifying ──► Completed             │
//! │       │               │                 │                               │
//! │       └───────────────┴────────┬────────┘                               │
//! │                                ▼                                        │
//! │                        Rejected(code)                                   │
//! │                                                                         │
//! │   Completed and Rejected are terminal.                                  │
//! │   Nothing is durable until the atomic commit inside Verifying.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Plan Building
//! ```text
//! SnapshotLine[] (live price + stock)
//!      │
//!      ├── empty?               → EmptyCart
//!      ├── qty > stock?         → InsufficientStock (first offending line)
//!      │
//!      ▼
//! OrderLine[] (frozen name + price)  +  total_amount = Σ price × qty
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CheckoutError, CoreResult, ErrorCode, PaymentFailure, ValidationError};
use crate::money::Money;
use crate::types::{OrderLine, SnapshotLine};

// =============================================================================
// Checkout State
// =============================================================================

/// Where a single checkout attempt currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    /// Snapshot taken, validation pending.
    Initiated,
    /// Payment intent created; the payer has been sent to the provider.
    AwaitingPayment,
    /// Confirmation is being checked and the order committed.
    Verifying,
    /// Order is durable.
    Completed,
    /// Attempt ended without an order.
    Rejected(ErrorCode),
}

impl CheckoutState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Completed | CheckoutState::Rejected(_))
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `Initiated → Verifying` is allowed for the synchronous variant, which
    /// skips the payment step.
    pub fn can_transition_to(&self, next: CheckoutState) -> bool {
        use CheckoutState::*;

        match (self, next) {
            (Initiated, AwaitingPayment) | (Initiated, Verifying) => true,
            (AwaitingPayment, Verifying) => true,
            (Verifying, Completed) => true,
            (current, Rejected(_)) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutState::Initiated => f.write_str("initiated"),
            CheckoutState::AwaitingPayment => f.write_str("awaiting_payment"),
            CheckoutState::Verifying => f.write_str("verifying"),
            CheckoutState::Completed => f.write_str("completed"),
            CheckoutState::Rejected(code) => write!(f, "rejected({})", code),
        }
    }
}

// =============================================================================
// Checkout Plan
// =============================================================================

/// Validated, frozen order lines ready for the atomic commit.
///
/// The only way to build one is [`plan_from_snapshot`], so a plan always
/// has at least one line and every line fitted the stock it was read with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    lines: Vec<OrderLine>,
    total_amount: i64,
}

impl CheckoutPlan {
    /// Frozen lines, in snapshot order.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Σ price × quantity, in minor units.
    pub fn total_amount(&self) -> i64 {
        self.total_amount
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Validates a snapshot and freezes it into a plan.
///
/// ## Errors
/// - `EmptyCart` if the snapshot has no lines
/// - `InsufficientStock` for the first line whose quantity exceeds stock
/// - `Validation` if the total would overflow
///
/// ## Example
/// ```rust
/// use stockline_core::checkout::plan_from_snapshot;
/// use stockline_core::SnapshotLine;
///
/// let snapshot = vec![SnapshotLine {
///     product_id: "a".into(),
///     product_name: "A".into(),
///     quantity: 2,
///     unit_price: 100,
///     stock: 5,
/// }];
///
/// let plan = plan_from_snapshot(&snapshot).unwrap();
/// assert_eq!(plan.total_amount(), 200);
/// ```
pub fn plan_from_snapshot(snapshot: &[SnapshotLine]) -> CoreResult<CheckoutPlan> {
    if snapshot.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut lines = Vec::with_capacity(snapshot.len());
    let mut total = Money::zero();

    for line in snapshot {
        if line.quantity > line.stock {
            return Err(CheckoutError::InsufficientStock {
                product: line.product_name.clone(),
                available: line.stock,
                requested: line.quantity,
            });
        }

        let frozen = OrderLine {
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            product_price: line.unit_price,
            quantity: line.quantity,
        };

        total = frozen
            .line_total()
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| {
                CheckoutError::Validation(ValidationError::OutOfRange {
                    field: "total_amount".to_string(),
                    min: 0,
                    max: i64::MAX,
                })
            })?;

        lines.push(frozen);
    }

    Ok(CheckoutPlan {
        lines,
        total_amount: total.minor(),
    })
}

/// Compares the amount the gateway reports against the plan total.
///
/// A gateway that reports no amount is not contradicted.
pub fn reconcile_amount(plan: &CheckoutPlan, reported: Option<i64>) -> Result<(), PaymentFailure> {
    match reported {
        Some(reported) if reported != plan.total_amount => Err(PaymentFailure::AmountMismatch {
            expected: plan.total_amount,
            reported,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Payment Reference
// =============================================================================

/// Builds a payment reference: `order_{unix_millis}_{user suffix}_{nonce}`.
///
/// The user suffix is the last six characters of the user id and the nonce
/// is the first eight hex digits of `nonce`, so two attempts by the same
/// user in the same millisecond still differ.
pub fn payment_reference(user_id: &str, now: DateTime<Utc>, nonce: Uuid) -> String {
    let suffix: String = {
        let chars: Vec<char> = user_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        let start = chars.len().saturating_sub(6);
        chars[start..].iter().collect()
    };

    let nonce = nonce.simple().to_string();

    format!("order_{}_{}_{}", now.timestamp_millis(), suffix, &nonce[..8])
}

/// [`payment_reference`] with the current time and a random nonce.
pub fn new_payment_reference(user_id: &str) -> String {
    payment_reference(user_id, Utc::now(), Uuid::new_v4())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_reference;
    use chrono::TimeZone;

    fn line(id: &str, qty: i64, price: i64, stock: i64) -> SnapshotLine {
        SnapshotLine {
            product_id: id.to_string(),
            product_name: id.to_uppercase(),
            quantity: qty,
            unit_price: price,
            stock,
        }
    }

    #[test]
    fn test_plan_freezes_lines_and_total() {
        let plan = plan_from_snapshot(&[line("a", 2, 100, 5), line("b", 1, 350, 1)]).unwrap();

        assert_eq!(plan.total_amount(), 550);
        assert_eq!(plan.line_count(), 2);
        assert_eq!(plan.lines()[0].product_name, "A");
        assert_eq!(plan.lines()[0].product_price, 100);
        assert_eq!(plan.lines()[1].product_id, "b");
    }

    #[test]
    fn test_plan_rejects_empty_snapshot() {
        assert!(matches!(plan_from_snapshot(&[]), Err(CheckoutError::EmptyCart)));
    }

    #[test]
    fn test_plan_names_first_short_line() {
        let err = plan_from_snapshot(&[line("a", 1, 100, 5), line("b", 2, 100, 1)]).unwrap_err();

        match err {
            CheckoutError::InsufficientStock {
                product,
                available,
                requested,
            } => {
                assert_eq!(product, "B");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plan_rejects_overflowing_total() {
        let err = plan_from_snapshot(&[line("a", 2, i64::MAX, 5)]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_reconcile_amount() {
        let plan = plan_from_snapshot(&[line("a", 2, 100, 5)]).unwrap();

        assert!(reconcile_amount(&plan, Some(200)).is_ok());
        assert!(reconcile_amount(&plan, None).is_ok());
        assert_eq!(
            reconcile_amount(&plan, Some(199)),
            Err(PaymentFailure::AmountMismatch {
                expected: 200,
                reported: 199
            })
        );
    }

    #[test]
    fn test_state_transitions() {
        use CheckoutState::*;

        assert!(Initiated.can_transition_to(AwaitingPayment));
        assert!(Initiated.can_transition_to(Verifying));
        assert!(AwaitingPayment.can_transition_to(Verifying));
        assert!(Verifying.can_transition_to(Completed));
        assert!(Verifying.can_transition_to(Rejected(ErrorCode::InsufficientStock)));

        assert!(!Initiated.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Rejected(ErrorCode::StorageError)));
        assert!(!Rejected(ErrorCode::EmptyCart).can_transition_to(Verifying));
    }

    #[test]
    fn test_payment_reference_format() {
        let now = Utc.timestamp_millis_opt(1_718_000_000_123).unwrap();
        let nonce = Uuid::parse_str("0f3a9c1d-0000-4000-8000-000000000000").unwrap();

        let reference = payment_reference("665f1c2ab3e4d5", now, nonce);
        assert_eq!(reference, "order_1718000000123_b3e4d5_0f3a9c1d");
        assert!(validate_reference(&reference).is_ok());
    }

    #[test]
    fn test_payment_reference_short_user_id() {
        let now = Utc.timestamp_millis_opt(1).unwrap();
        let reference = payment_reference("u1", now, Uuid::nil());
        assert_eq!(reference, "order_1_u1_00000000");
    }

    #[test]
    fn test_new_payment_references_differ() {
        assert_ne!(new_payment_reference("user-1"), new_payment_reference("user-1"));
    }
}
