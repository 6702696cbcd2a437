//! # Cart Repository
//!
//! Cart lines and the snapshot provider.
//!
//! ## Snapshot
//! ```text
//! cart_lines (user_id = ?)  ⋈  products (live)
//!      │
//!      ▼
//! SnapshotLine { product_id, product_name, quantity, unit_price, stock }
//!      ordered by cart insertion (rowid), never cached
//! ```
//!
//! Cart edits check stock at the time of the edit. That check is advisory:
//! checkout validates the snapshot again and the conditional decrement has
//! the final word.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::product::ProductRepository;
use stockline_core::validation::{validate_quantity, validate_user_id};
use stockline_core::{CartLine, Entity, OrderLine, SnapshotLine, MAX_ITEM_QUANTITY};

const SNAPSHOT_SQL: &str = r#"
    SELECT
        c.product_id AS product_id,
        p.name       AS product_name,
        c.quantity   AS quantity,
        p.price      AS unit_price,
        p.stock      AS stock
    FROM cart_lines c
    INNER JOIN products p ON p.id = c.product_id
    WHERE c.user_id = ?1
    ORDER BY c.rowid
"#;

/// Repository for cart lines.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Current cart contents joined with live product price and stock.
    ///
    /// An empty cart yields an empty vector; deciding that this is an
    /// error is the caller's job.
    pub async fn snapshot(&self, user_id: &str) -> DbResult<Vec<SnapshotLine>> {
        validate_user_id(user_id)?;

        let lines = sqlx::query_as::<_, SnapshotLine>(SNAPSHOT_SQL)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(user_id = %user_id, lines = lines.len(), "Cart snapshot taken");
        Ok(lines)
    }

    /// Cart view for display. Same join as [`CartRepository::snapshot`].
    pub async fn lines(&self, user_id: &str) -> DbResult<Vec<SnapshotLine>> {
        self.snapshot(user_id).await
    }

    /// Adds `quantity` of a product, merging with an existing line.
    ///
    /// The merge happens inside one upsert, so concurrent adds to the same
    /// line all count. The stock and per-line limits are part of the
    /// statement; when it writes nothing, a follow-up read only classifies
    /// the refusal.
    ///
    /// ## Errors
    /// - `NotFound` - product doesn't exist
    /// - `InsufficientStock` - merged quantity exceeds current stock
    /// - `Validation` - quantity (or merged quantity) outside 1..=999
    pub async fn add_line(&self, user_id: &str, product_id: &str, quantity: i64) -> DbResult<CartLine> {
        validate_user_id(user_id)?;
        validate_quantity(quantity)?;

        debug!(user_id = %user_id, product_id = %product_id, quantity = quantity, "Adding to cart");

        let result = sqlx::query(
            r#"
            INSERT INTO cart_lines (user_id, product_id, quantity, created_at, updated_at)
            SELECT ?1, ?2, ?3, ?4, ?4 FROM products WHERE id = ?2 AND stock >= ?3
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET quantity = cart_lines.quantity + excluded.quantity,
                updated_at = excluded.updated_at
            WHERE cart_lines.quantity + excluded.quantity <= ?5
              AND cart_lines.quantity + excluded.quantity <= (SELECT stock FROM products WHERE id = ?2)
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .bind(MAX_ITEM_QUANTITY)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.classify_refused_add(user_id, product_id, quantity).await);
        }

        self.get_line(user_id, product_id).await
    }

    /// Replaces the quantity of an existing line.
    ///
    /// ## Errors
    /// - `NotFound(Product)` - product doesn't exist
    /// - `InsufficientStock` - quantity exceeds current stock
    /// - `NotFound(CartItem)` - no line for this product
    pub async fn update_quantity(&self, user_id: &str, product_id: &str, quantity: i64) -> DbResult<CartLine> {
        validate_user_id(user_id)?;
        validate_quantity(quantity)?;

        let product = ProductRepository::new(self.pool.clone()).get(product_id).await?;

        if !product.can_supply(quantity) {
            return Err(DbError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: quantity,
            });
        }

        debug!(user_id = %user_id, product_id = %product_id, quantity = quantity, "Updating cart line");

        let result = sqlx::query(
            r#"
            UPDATE cart_lines SET quantity = ?3, updated_at = ?4
            WHERE user_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Entity::CartItem, product_id));
        }

        self.get_line(user_id, product_id).await
    }

    /// Removes one line. NotFound if there was none.
    pub async fn remove_line(&self, user_id: &str, product_id: &str) -> DbResult<()> {
        validate_user_id(user_id)?;

        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Entity::CartItem, product_id));
        }

        debug!(user_id = %user_id, product_id = %product_id, "Removed cart line");
        Ok(())
    }

    /// Deletes every line for the user. Clearing an empty cart is a no-op.
    ///
    /// Returns the number of lines removed.
    pub async fn clear(&self, user_id: &str) -> DbResult<u64> {
        validate_user_id(user_id)?;

        let mut conn = self.pool.acquire().await?;
        clear_in(&mut conn, user_id).await
    }

    async fn classify_refused_add(&self, user_id: &str, product_id: &str, quantity: i64) -> DbError {
        let product = match ProductRepository::new(self.pool.clone()).get(product_id).await {
            Ok(product) => product,
            Err(e) => return e,
        };

        let current = match self.find_line(user_id, product_id).await {
            Ok(line) => line.map_or(0, |line| line.quantity),
            Err(e) => return e,
        };

        let merged = current.saturating_add(quantity);
        if let Err(e) = validate_quantity(merged) {
            return e.into();
        }

        DbError::InsufficientStock {
            product: product.name,
            available: product.stock,
            requested: merged,
        }
    }

    async fn find_line(&self, user_id: &str, product_id: &str) -> DbResult<Option<CartLine>> {
        let line = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT user_id, product_id, quantity, created_at, updated_at
            FROM cart_lines
            WHERE user_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(line)
    }

    async fn get_line(&self, user_id: &str, product_id: &str) -> DbResult<CartLine> {
        self.find_line(user_id, product_id)
            .await?
            .ok_or_else(|| DbError::not_found(Entity::CartItem, product_id))
    }
}

/// Deletes all of a user's cart lines on the given connection.
pub(crate) async fn clear_in(conn: &mut SqliteConnection, user_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    debug!(user_id = %user_id, removed = result.rows_affected(), "Cart cleared");
    Ok(result.rows_affected())
}

/// Removes exactly the lines an order was planned from.
///
/// A line is only deleted if its quantity still matches the plan. Returns
/// how many lines matched; anything short of `lines.len()` means the cart
/// moved after the snapshot (or another checkout already consumed it).
pub(crate) async fn consume_in(conn: &mut SqliteConnection, user_id: &str, lines: &[OrderLine]) -> DbResult<u64> {
    let mut consumed = 0;

    for line in lines {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = ?1 AND product_id = ?2 AND quantity = ?3")
            .bind(user_id)
            .bind(&line.product_id)
            .bind(line.quantity)
            .execute(&mut *conn)
            .await?;

        consumed += result.rows_affected();
    }

    debug!(user_id = %user_id, planned = lines.len(), consumed = consumed, "Cart lines consumed");
    Ok(consumed)
}

// =============================================================================
// Unit Tests
// =============================================================================
