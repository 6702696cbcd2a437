//! # Checkout Commit
//!
//! The atomic section of a checkout.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    INSERT INTO orders ...          ← first statement is a write, so the │
//! │    INSERT INTO order_lines ...       write lock is taken up front       │
//! │    UPDATE products ... WHERE stock >= ?   (per line, snapshot order)    │
//! │    DELETE FROM cart_lines                                               │
//! │      WHERE user_id = ? AND product_id = ? AND quantity = ?  (per line)  │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any `?` before COMMIT drops the transaction → ROLLBACK.                │
//! │  Order row, decrements and consumed lines are visible together or not   │
//! │  at all.                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the lines the plan was built from are deleted. If fewer rows match
//! than the plan has lines, the cart was consumed or edited since the
//! snapshot and the whole transaction is abandoned with `CartChanged`. Two
//! checkouts of one cart therefore produce one order, whatever their
//! references.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{cart, generate_id, order, product};
use stockline_core::{CheckoutPlan, Order, OrderStatus};

/// Runs the atomic checkout commit.
#[derive(Debug, Clone)]
pub struct CheckoutRepository {
    pool: SqlitePool,
}

impl CheckoutRepository {
    /// Creates a new CheckoutRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutRepository { pool }
    }

    /// Writes a completed order for `plan`, takes its stock and removes the
    /// planned lines from the user's cart, all in one transaction.
    ///
    /// ## Errors
    /// - `UniqueViolation(payment_reference)` - reference already used
    /// - `InsufficientStock` / `NotFound` - a decrement was refused
    /// - `CartChanged` - the planned lines are no longer all in the cart
    ///
    /// On error nothing is written.
    pub async fn commit(&self, user_id: &str, reference: &str, plan: &CheckoutPlan) -> DbResult<Order> {
        let now = Utc::now();

        let order = Order {
            id: generate_id(),
            user_id: user_id.to_string(),
            items: plan.lines().to_vec(),
            total_amount: plan.total_amount(),
            status: OrderStatus::Completed,
            payment_reference: reference.to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        order::insert_in(&mut tx, &order).await?;

        for line in &order.items {
            product::reduce_stock_in(&mut tx, &line.product_id, line.quantity).await?;
        }

        let consumed = cart::consume_in(&mut tx, user_id, &order.items).await?;
        if consumed != order.items.len() as u64 {
            warn!(
                user_id = %user_id,
                reference = %reference,
                planned = order.items.len(),
                consumed = consumed,
                "Cart changed under checkout, rolling back"
            );
            return Err(DbError::CartChanged {
                user_id: user_id.to_string(),
            });
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(cart_lines_consumed = consumed, "Checkout transaction committed");
        info!(
            order_id = %order.id,
            user_id = %user_id,
            reference = %reference,
            total_amount = order.total_amount,
            "Order committed"
        );

        Ok(order)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use stockline_core::checkout::plan_from_snapshot;
    use stockline_core::SnapshotLine;

    #[tokio::test]
    async fn test_commit_writes_order_takes_stock_and_clears_cart() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.products().create("A", None, 100, 5).await.unwrap();
        db.carts().add_line("u1", &a.id, 2).await.unwrap();

        let plan = plan_from_snapshot(&db.carts().snapshot("u1").await.unwrap()).unwrap();
        let order = db.checkout().commit("u1", "ref-1", &plan).await.unwrap();

        assert_eq!(order.total_amount, 200);
        assert_eq!(db.products().get(&a.id).await.unwrap().stock, 3);
        assert!(db.carts().snapshot("u1").await.unwrap().is_empty());
        assert_eq!(
            db.orders().find_by_reference("ref-1").await.unwrap(),
            Some(order)
        );
    }

    #[tokio::test]
    async fn test_failed_decrement_rolls_back_everything() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.products().create("A", None, 100, 5).await.unwrap();
        let b = db.products().create("B", None, 100, 3).await.unwrap();
        db.carts().add_line("u1", &a.id, 2).await.unwrap();
        db.carts().add_line("u1", &b.id, 2).await.unwrap();

        // Plan built while B still had 3, then B drops to 1 underneath it.
        let snapshot = db.carts().snapshot("u1").await.unwrap();
        let plan = plan_from_snapshot(&snapshot).unwrap();
        db.products().update_stock(&b.id, 1).await.unwrap();

        let err = db.checkout().commit("u1", "ref-1", &plan).await.unwrap_err();
        assert!(matches!(err, DbError::InsufficientStock { available: 1, .. }));

        assert_eq!(db.orders().count().await.unwrap(), 0);
        assert_eq!(db.products().get(&a.id).await.unwrap().stock, 5);
        assert_eq!(db.products().get(&b.id).await.unwrap().stock, 1);
        assert_eq!(db.carts().snapshot("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_reference_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.products().create("A", None, 100, 5).await.unwrap();

        db.carts().add_line("u1", &a.id, 1).await.unwrap();
        let plan = plan_from_snapshot(&db.carts().snapshot("u1").await.unwrap()).unwrap();
        db.checkout().commit("u1", "ref-1", &plan).await.unwrap();

        db.carts().add_line("u1", &a.id, 1).await.unwrap();
        let plan = plan_from_snapshot(&db.carts().snapshot("u1").await.unwrap()).unwrap();
        let err = db.checkout().commit("u1", "ref-1", &plan).await.unwrap_err();

        assert!(err.is_unique_violation_on("payment_reference"));
        assert_eq!(db.products().get(&a.id).await.unwrap().stock, 4);
        assert_eq!(db.carts().snapshot("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_with_missing_product_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let plan = plan_from_snapshot(&[SnapshotLine {
            product_id: "ghost".to_string(),
            product_name: "Ghost".to_string(),
            quantity: 1,
            unit_price: 10,
            stock: 1,
        }])
        .unwrap();

        let err = db.checkout().commit("u1", "ref-1", &plan).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_same_cart_cannot_be_committed_twice() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.products().create("A", None, 100, 10).await.unwrap();
        db.carts().add_line("u1", &a.id, 2).await.unwrap();

        // Both plans read the same cart before either commits.
        let snapshot = db.carts().snapshot("u1").await.unwrap();
        let first = plan_from_snapshot(&snapshot).unwrap();
        let second = plan_from_snapshot(&snapshot).unwrap();

        db.checkout().commit("u1", "ref-one", &first).await.unwrap();
        let err = db.checkout().commit("u1", "ref-two", &second).await.unwrap_err();

        assert!(matches!(err, DbError::CartChanged { .. }));
        assert_eq!(db.orders().count().await.unwrap(), 1);
        assert_eq!(db.orders().find_by_reference("ref-two").await.unwrap(), None);
        assert_eq!(db.products().get(&a.id).await.unwrap().stock, 8);
    }

    #[tokio::test]
    async fn test_line_added_after_snapshot_stays_in_cart() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.products().create("A", None, 100, 5).await.unwrap();
        let b = db.products().create("B", None, 300, 5).await.unwrap();
        db.carts().add_line("u1", &a.id, 1).await.unwrap();

        let plan = plan_from_snapshot(&db.carts().snapshot("u1").await.unwrap()).unwrap();
        db.carts().add_line("u1", &b.id, 2).await.unwrap();

        let order = db.checkout().commit("u1", "ref-1", &plan).await.unwrap();
        assert_eq!(order.items.len(), 1);

        let left = db.carts().snapshot("u1").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].product_id, b.id);
        assert_eq!(left[0].quantity, 2);
        assert_eq!(db.products().get(&b.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_quantity_changed_after_snapshot_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.products().create("A", None, 100, 5).await.unwrap();
        db.carts().add_line("u1", &a.id, 1).await.unwrap();

        let plan = plan_from_snapshot(&db.carts().snapshot("u1").await.unwrap()).unwrap();
        db.carts().update_quantity("u1", &a.id, 3).await.unwrap();

        let err = db.checkout().commit("u1", "ref-1", &plan).await.unwrap_err();
        assert!(matches!(err, DbError::CartChanged { .. }));

        assert_eq!(db.orders().count().await.unwrap(), 0);
        assert_eq!(db.products().get(&a.id).await.unwrap().stock, 5);
        assert_eq!(db.carts().snapshot("u1").await.unwrap()[0].quantity, 3);
    }
}
