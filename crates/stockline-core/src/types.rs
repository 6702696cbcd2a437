//! # Domain Types
//!
//! Core domain types used throughout Stockline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    CartLine     │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  user_id ─┐     │   │  id             │       │
//! │  │  name           │   │  product_id ┘   │   │  user_id        │       │
//! │  │  price (minor)  │   │  (unique pair)  │   │  items[]  ◄─ frozen      │
//! │  │  stock (>= 0)   │   │  quantity >= 1  │   │  total_amount   │       │
//! │  └─────────────────┘   └─────────────────┘   │  payment_ref ◄─ unique   │
//! │                                              └─────────────────┘       │
//! │                                                                         │
//! │  SnapshotLine = CartLine ⋈ Product, read at call time                  │
//! │  OrderLine    = frozen copy of a SnapshotLine inside an Order          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
///
/// `stock` is only ever lowered by the conditional decrement in the
/// inventory ledger, or set by an administrative update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Opaque identifier (UUID v4 for seeded data).
    pub id: String,

    /// Display name, copied into order lines at checkout.
    pub name: String,

    /// Optional long description.
    pub description: Option<String>,

    /// Unit price in minor currency units.
    pub price: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_minor(self.price)
    }

    /// Checks whether `quantity` units could currently be taken.
    pub fn can_supply(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A single line in a user's cart. At most one per (user, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLine {
    pub user_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with live product data.
///
/// Produced fresh on every call; never cached. Used both to validate a
/// checkout and as the source that order lines are frozen from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SnapshotLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    /// Current unit price in minor units.
    pub unit_price: i64,
    /// Current stock.
    pub stock: i64,
}

impl SnapshotLine {
    /// Line total at current price, `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        Money::from_minor(self.unit_price).checked_times(self.quantity)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order.
///
/// The checkout commit writes orders directly as `Completed`; `Pending` and
/// `Cancelled` exist for the status column's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Completed) | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }
}

// =============================================================================
// Order
// =============================================================================

/// A frozen copy of catalog + cart data at the moment of checkout.
///
/// Later product edits never touch these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    /// Product name at time of order (frozen).
    pub product_name: String,
    /// Unit price at time of order (frozen).
    pub product_price: i64,
    pub quantity: i64,
}

impl OrderLine {
    /// Frozen price × quantity, `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        Money::from_minor(self.product_price).checked_times(self.quantity)
    }
}

/// A completed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    /// Lines in cart snapshot order.
    pub items: Vec<OrderLine>,
    /// Σ product_price × quantity over `items`.
    pub total_amount: i64,
    pub status: OrderStatus,
    /// Globally unique; the idempotency key for payment verification.
    pub payment_reference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether this order belongs to `user_id`.
    #[inline]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

// =============================================================================
// Checkout Session
// =============================================================================

/// What a client needs to send the payer to the provider's checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
    /// Amount the payer was asked for, in minor units.
    pub amount: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            name: "Desk Lamp".to_string(),
            description: None,
            price: 2500,
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_can_supply() {
        let p = product(3);
        assert!(p.can_supply(3));
        assert!(!p.can_supply(4));
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_order_status_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_order_status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn test_snapshot_line_total() {
        let line = SnapshotLine {
            product_id: "p-1".to_string(),
            product_name: "Desk Lamp".to_string(),
            quantity: 2,
            unit_price: 100,
            stock: 5,
        };
        assert_eq!(line.line_total(), Some(Money::from_minor(200)));
    }

    #[test]
    fn test_order_line_total_checks_overflow() {
        let mut line = OrderLine {
            product_id: "p-1".to_string(),
            product_name: "Desk Lamp".to_string(),
            product_price: 2500,
            quantity: 3,
        };
        assert_eq!(line.line_total(), Some(Money::from_minor(7500)));

        line.product_price = i64::MAX;
        assert_eq!(line.line_total(), None);
    }
}
