//! # Product Repository
//!
//! Database operations for the product registry.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ WRONG: Absolute update (last writer wins)                      │
//! │     UPDATE products SET quantity = 7 WHERE id = ?                  │
//! │                                                                     │
//! │  ✅ CORRECT: Guarded delta                                         │
//! │     UPDATE products SET quantity = quantity - 3                    │
//! │     WHERE id = ? AND quantity >= 3                                 │
//! │                                                                     │
//! │  Zero rows affected means the stock read earlier is stale; the     │
//! │  engine aborts the unit of work instead of going negative.         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::Product;

const PRODUCT_COLUMNS: &str =
    "id, sku, name, quantity, cost_cents, reorder_level, created_at, updated_at";

// =============================================================================
// Unit-of-work functions
// =============================================================================

pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

pub async fn get_by_sku(conn: &mut SqliteConnection, sku: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
    ))
    .bind(sku)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

/// Inserts a product.
///
/// ## Returns
/// * `Err(DbError::UniqueViolation)` - SKU already exists
pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(sku = %product.sku, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, sku, name, quantity, cost_cents, reorder_level, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&product.id)
    .bind(&product.sku)
    .bind(&product.name)
    .bind(product.quantity)
    .bind(product.cost_cents)
    .bind(product.reorder_level)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Takes `quantity` units off the shelf.
///
/// Returns `false` when fewer than `quantity` units are on hand.
pub async fn decrement_quantity(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
    at: DateTime<Utc>,
) -> DbResult<bool> {
    debug!(id = %id, quantity, "Decrementing stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity - ?2, updated_at = ?3
        WHERE id = ?1 AND quantity >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Puts `quantity` units back on the shelf (receipts, returns).
pub async fn increment_quantity(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
    at: DateTime<Utc>,
) -> DbResult<()> {
    debug!(id = %id, quantity, "Incrementing stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(at)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

// =============================================================================
// Reader
// =============================================================================

/// Read-only access to products outside a unit of work.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, id).await
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        get_by_sku(&mut conn, sku).await
    }

    /// Products ordered by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Products at or below their reorder level, emptiest first.
    pub async fn needing_reorder(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE quantity <= reorder_level
             ORDER BY quantity ASC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Products needing reorder");
        Ok(products)
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn product(sku: &str, quantity: i64, reorder_level: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            quantity,
            cost_cents: 100,
            reorder_level,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded(products: &[Product]) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = db.begin(0).await.unwrap();
        for p in products {
            insert(uow.conn().unwrap(), p).await.unwrap();
        }
        uow.commit().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let p = product("COKE-330", 10, 2);
        let db = seeded(std::slice::from_ref(&p)).await;

        let by_id = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(by_id.sku, "COKE-330");
        assert_eq!(by_id.quantity, 10);

        let by_sku = db.products().get_by_sku("COKE-330").await.unwrap().unwrap();
        assert_eq!(by_sku.id, p.id);
        assert!(db.products().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = seeded(&[product("COKE-330", 1, 0)]).await;

        let mut uow = db.begin(0).await.unwrap();
        let err = insert(uow.conn().unwrap(), &product("COKE-330", 1, 0))
            .await
            .unwrap_err();
        uow.rollback().await;

        assert!(err.is_unique_violation_on("products.sku"));
    }

    #[tokio::test]
    async fn test_guarded_decrement() {
        let p = product("TEA-1", 3, 0);
        let db = seeded(std::slice::from_ref(&p)).await;

        let mut uow = db.begin(0).await.unwrap();
        assert!(!decrement_quantity(uow.conn().unwrap(), &p.id, 4, Utc::now()).await.unwrap());
        assert!(decrement_quantity(uow.conn().unwrap(), &p.id, 3, Utc::now()).await.unwrap());
        uow.commit().await.unwrap();

        let after = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 0);
    }

    #[tokio::test]
    async fn test_increment_unknown_product() {
        let db = seeded(&[]).await;
        let mut uow = db.begin(0).await.unwrap();
        let err = increment_quantity(uow.conn().unwrap(), "nope", 1, Utc::now())
            .await
            .unwrap_err();
        uow.rollback().await;
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_needing_reorder() {
        let db = seeded(&[
            product("LOW", 2, 5),
            product("EDGE", 5, 5),
            product("FULL", 50, 5),
        ])
        .await;

        let low: Vec<String> = db
            .products()
            .needing_reorder()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.sku)
            .collect();
        assert_eq!(low, vec!["LOW", "EDGE"]);
        assert_eq!(db.products().count().await.unwrap(), 3);
    }
}
