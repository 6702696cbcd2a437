//! # Order Repository
//!
//! The order ledger: append-only, keyed by a unique payment reference.
//!
//! ## Storage Layout
//! ```text
//! orders                         order_lines
//! ┌──────────────────────┐       ┌──────────────────────────────┐
//! │ id (PK)              │◄──────│ order_id                     │
//! │ user_id              │       │ position     ─┐ PK           │
//! │ total_amount         │       │ product_id    │              │
//! │ status               │       │ product_name  │ frozen copy  │
//! │ payment_reference ◄──┼─ UNIQUE product_price │              │
//! │ created_at           │       │ quantity     ─┘              │
//! └──────────────────────┘       └──────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockline_core::{Order, OrderLine, OrderStatus};

const ORDER_COLUMNS: &str =
    "id, user_id, total_amount, status, payment_reference, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    total_amount: i64,
    status: OrderStatus,
    payment_reference: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    order_id: String,
    product_id: String,
    product_name: String,
    product_price: i64,
    quantity: i64,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderLine>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            items,
            total_amount: self.total_amount,
            status: self.status,
            payment_reference: self.payment_reference,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            product_id: row.product_id,
            product_name: row.product_name,
            product_price: row.product_price,
            quantity: row.quantity,
        }
    }
}

/// Repository for the order ledger.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an order and its lines in one transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - payment reference already used
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        insert_in(&mut tx, order).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Looks up an order by payment reference.
    pub async fn find_by_reference(&self, reference: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE payment_reference = ?1");

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.with_lines(row).await?)),
            None => Ok(None),
        }
    }

    /// Looks up an order by id.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.with_lines(row).await?)),
            None => Ok(None),
        }
    }

    /// All orders for a user, newest first.
    pub async fn find_by_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        );

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let line_rows = sqlx::query_as::<_, OrderLineRow>(
            r#"
            SELECT l.order_id, l.product_id, l.product_name, l.product_price, l.quantity
            FROM order_lines l
            INNER JOIN orders o ON o.id = l.order_id
            WHERE o.user_id = ?1
            ORDER BY l.order_id, l.position
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut lines_by_order: HashMap<String, Vec<OrderLine>> = HashMap::new();
        for line in line_rows {
            lines_by_order
                .entry(line.order_id.clone())
                .or_default()
                .push(line.into());
        }

        let orders: Vec<Order> = rows
            .into_iter()
            .map(|row| {
                let items = lines_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect();

        debug!(user_id = %user_id, count = orders.len(), "Loaded orders");
        Ok(orders)
    }

    /// Counts orders (for diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn with_lines(&self, row: OrderRow) -> DbResult<Order> {
        let lines = sqlx::query_as::<_, OrderLineRow>(
            r#"
            SELECT order_id, product_id, product_name, product_price, quantity
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(row.into_order(lines.into_iter().map(OrderLine::from).collect()))
    }
}

/// Writes an order row and its lines on the given connection.
///
/// A reused payment reference surfaces as
/// `UniqueViolation { field: "payment_reference", value: <reference> }`.
pub(crate) async fn insert_in(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(id = %order.id, reference = %order.payment_reference, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, user_id, total_amount, status, payment_reference, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&order.id)
    .bind(&order.user_id)
    .bind(order.total_amount)
    .bind(order.status)
    .bind(&order.payment_reference)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        err if err.is_unique_violation_on("payment_reference") => {
            DbError::duplicate("payment_reference", &order.payment_reference)
        }
        other => other,
    })?;

    for (position, line) in order.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_lines (
                order_id, position, product_id, product_name, product_price, quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&order.id)
        .bind(position as i64)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.product_price)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;

    fn order(user_id: &str, reference: &str, created_at: DateTime<Utc>) -> Order {
        Order {
            id: crate::repository::generate_id(),
            user_id: user_id.to_string(),
            items: vec![
                OrderLine {
                    product_id: "a".to_string(),
                    product_name: "A".to_string(),
                    product_price: 100,
                    quantity: 2,
                },
                OrderLine {
                    product_id: "b".to_string(),
                    product_name: "B".to_string(),
                    product_price: 50,
                    quantity: 1,
                },
            ],
            total_amount: 250,
            status: OrderStatus::Completed,
            payment_reference: reference.to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_reference() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();
        let o = order("u1", "ref-1", Utc::now());

        repo.insert(&o).await.unwrap();

        let found = repo.find_by_reference("ref-1").await.unwrap().unwrap();
        assert_eq!(found, o);
        assert_eq!(found.items[0].product_name, "A");
        assert_eq!(found.items[1].product_name, "B");

        assert!(repo.find_by_reference("ref-2").await.unwrap().is_none());
        assert_eq!(repo.find_by_id(&o.id).await.unwrap(), Some(o));
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();

        repo.insert(&order("u1", "ref-1", Utc::now())).await.unwrap();
        let err = repo.insert(&order("u2", "ref-1", Utc::now())).await.unwrap_err();

        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "payment_reference");
                assert_eq!(value, "ref-1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_user_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();
        let now = Utc::now();

        repo.insert(&order("u1", "old", now - Duration::hours(1))).await.unwrap();
        repo.insert(&order("u1", "new", now)).await.unwrap();
        repo.insert(&order("u2", "other", now)).await.unwrap();

        let orders = repo.find_by_user("u1").await.unwrap();
        let refs: Vec<&str> = orders.iter().map(|o| o.payment_reference.as_str()).collect();

        assert_eq!(refs, vec!["new", "old"]);
        assert!(orders.iter().all(|o| o.items.len() == 2));
    }
}
