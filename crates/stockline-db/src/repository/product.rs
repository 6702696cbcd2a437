//! # Product Repository
//!
//! Catalog lookup and the inventory ledger.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Conditional Decrement                                │
//! │                                                                         │
//! │  ❌ WRONG: read, compare in Rust, write                                │
//! │     SELECT stock ...; if stock >= qty { UPDATE ... SET stock = ? }      │
//! │     Two checkouts both read 1, both write 0 → oversold                  │
//! │                                                                         │
//! │  ✅ CORRECT: one statement, the condition travels with the write       │
//! │     UPDATE products SET stock = stock - ?2                              │
//! │     WHERE id = ?1 AND stock >= ?2                                       │
//! │                                                                         │
//! │  rows_affected == 1 → taken                                             │
//! │  rows_affected == 0 → follow-up read only to say *why*                  │
//! │                       (no such product vs not enough stock)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use stockline_core::validation::{validate_price, validate_product_name, validate_stock};
use stockline_core::{Entity, Product, ValidationError};

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let lamp = repo.create("Desk Lamp", None, 2500, 10).await?;
/// repo.reduce_stock(&lamp.id, 3).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Lists products ordered by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name LIMIT ?1");

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its ID, failing with NotFound if absent.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(Entity::Product, id))
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - id already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_product_name(&product.name)?;
        validate_price(product.price)?;
        validate_stock(product.stock)?;

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Builds a product with a fresh id and timestamps, then inserts it.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        price: i64,
        stock: i64,
    ) -> DbResult<Product> {
        let now = Utc::now();

        let product = Product {
            id: generate_id(),
            name: name.trim().to_string(),
            description: description.map(str::to_string),
            price,
            stock,
            created_at: now,
            updated_at: now,
        };

        self.insert(&product).await
    }

    /// Updates name, description and price.
    ///
    /// Stock is deliberately untouched; it only moves through the ledger
    /// methods below. Orders already placed keep their frozen copies.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_product_name(&product.name)?;
        validate_price(product.price)?;

        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                price = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Entity::Product, &product.id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Inventory Ledger
    // =========================================================================

    /// Atomically takes `quantity` units of stock.
    ///
    /// ## Returns
    /// * `Ok(())` - stock decreased by exactly `quantity`
    /// * `Err(DbError::InsufficientStock)` - stock unchanged
    /// * `Err(DbError::NotFound)` - no such product
    pub async fn reduce_stock(&self, id: &str, quantity: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        reduce_stock_in(&mut conn, id, quantity).await
    }

    /// Sets stock to an absolute value (administrative correction).
    pub async fn update_stock(&self, id: &str, new_stock: i64) -> DbResult<()> {
        validate_stock(new_stock)?;

        debug!(id = %id, new_stock = new_stock, "Setting stock");

        let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(new_stock)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Entity::Product, id));
        }

        Ok(())
    }

    /// Adds `delta` units of stock.
    pub async fn restock(&self, id: &str, delta: i64) -> DbResult<()> {
        if delta <= 0 {
            return Err(ValidationError::OutOfRange {
                field: "delta".to_string(),
                min: 1,
                max: i64::MAX,
            }
            .into());
        }

        debug!(id = %id, delta = delta, "Restocking");

        let result = sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(delta)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Entity::Product, id));
        }

        Ok(())
    }
}

/// The conditional decrement, on any connection (pool or transaction).
///
/// One `UPDATE ... WHERE stock >= ?` statement decides success. When it
/// affects no row, the follow-up `SELECT` only classifies the failure.
pub(crate) async fn reduce_stock_in(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::MAX,
        }
        .into());
    }

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        debug!(id = %id, quantity = quantity, "Stock reduced");
        return Ok(());
    }

    let current: Option<(String, i64)> = sqlx::query_as("SELECT name, stock FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match current {
        None => Err(DbError::not_found(Entity::Product, id)),
        Some((name, stock)) => {
            warn!(id = %id, available = stock, requested = quantity, "Conditional decrement refused");
            Err(DbError::InsufficientStock {
                product: name,
                available: stock,
                requested: quantity,
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup().await;
        let repo = db.products();

        let lamp = repo.create("Desk Lamp", Some("LED"), 2500, 10).await.unwrap();
        let found = repo.get(&lamp.id).await.unwrap();

        assert_eq!(found.name, "Desk Lamp");
        assert_eq!(found.description.as_deref(), Some("LED"));
        assert_eq!(found.price, 2500);
        assert_eq!(found.stock, 10);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let db = setup().await;
        let err = db.products().get("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_negative_stock() {
        let db = setup().await;
        let err = db.products().create("Broken", None, 100, -1).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reduce_stock_success() {
        let db = setup().await;
        let repo = db.products();
        let p = repo.create("A", None, 100, 5).await.unwrap();

        repo.reduce_stock(&p.id, 2).await.unwrap();
        assert_eq!(repo.get(&p.id).await.unwrap().stock, 3);

        repo.reduce_stock(&p.id, 3).await.unwrap();
        assert_eq!(repo.get(&p.id).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_reduce_stock_insufficient_leaves_stock_unchanged() {
        let db = setup().await;
        let repo = db.products();
        let p = repo.create("B", None, 100, 1).await.unwrap();

        let err = repo.reduce_stock(&p.id, 2).await.unwrap_err();
        match err {
            DbError::InsufficientStock {
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

        assert_eq!(repo.get(&p.id).await.unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_reduce_stock_missing_product() {
        let db = setup().await;
        let err = db.products().reduce_stock("ghost", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_stock_and_restock() {
        let db = setup().await;
        let repo = db.products();
        let p = repo.create("C", None, 100, 5).await.unwrap();

        repo.update_stock(&p.id, 9).await.unwrap();
        assert_eq!(repo.get(&p.id).await.unwrap().stock, 9);

        repo.restock(&p.id, 1).await.unwrap();
        assert_eq!(repo.get(&p.id).await.unwrap().stock, 10);

        assert!(repo.update_stock(&p.id, -1).await.is_err());
        assert!(repo.restock(&p.id, 0).await.is_err());
        assert!(matches!(
            repo.update_stock("ghost", 1).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_update_changes_price_not_stock() {
        let db = setup().await;
        let repo = db.products();
        let mut p = repo.create("D", None, 100, 4).await.unwrap();

        p.price = 150;
        p.stock = 999;
        repo.update(&p).await.unwrap();

        let found = repo.get(&p.id).await.unwrap();
        assert_eq!(found.price, 150);
        assert_eq!(found.stock, 4);
    }

    #[tokio::test]
    async fn test_list_orders_by_name() {
        let db = setup().await;
        let repo = db.products();
        repo.create("Zebra", None, 1, 1).await.unwrap();
        repo.create("Apple", None, 1, 1).await.unwrap();

        let names: Vec<String> = repo.list(10).await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Apple", "Zebra"]);
    }
}
