//! # Inventory Repository
//!
//! Database operations for products.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (lost-update race between terminals)        │
//! │     SELECT stock FROM inventory WHERE id = ?                            │
//! │     UPDATE inventory SET stock = 7 WHERE id = ?                         │
//! │                                                                         │
//! │  ✅ CORRECT: conditional delta update (single indivisible statement)   │
//! │     UPDATE inventory SET stock = stock - 3                              │
//! │     WHERE id = ? AND stock >= 3                                         │
//! │                                                                         │
//! │  Two terminals selling the same product cannot both succeed if their    │
//! │  combined quantity exceeds stock: the second UPDATE matches zero rows   │
//! │  and its whole finalize rolls back.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use ludo_core::{CoreError, Product};

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Lists all products ordered by name.
    pub async fn list(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, created_at, updated_at
            FROM inventory
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, created_at, updated_at
            FROM inventory
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> StoreResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO inventory (id, name, price_cents, stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a product's price.
    ///
    /// Historical sale lines keep their price snapshots; only future
    /// carts see the new price.
    pub async fn update_price(
        &self,
        id: &str,
        price_cents: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        debug!(id = %id, price_cents = %price_cents, "Updating price");

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET price_cents = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(price_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        Ok(())
    }

    /// Adds stock to a product (restock).
    ///
    /// Unconditional delta: replenishment can never violate the
    /// non-negative invariant.
    pub async fn add_stock(&self, id: &str, quantity: i64, now: DateTime<Utc>) -> StoreResult<()> {
        debug!(id = %id, quantity = %quantity, "Adding stock");

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        Ok(())
    }

    /// Hard-deletes a product.
    ///
    /// Historical sales keep their line snapshots (there is no foreign
    /// key from sale lines to inventory), so deletion never alters past
    /// totals.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM inventory WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products (for diagnostics and seed checks).
    pub async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================
// Used inside engine transactions; never exposed outside the crate.

/// Conditionally decrements stock: the check-and-decrement the finalizer
/// depends on, as one indivisible statement.
///
/// ## Failure Mapping
/// Zero rows affected means the guard failed. The product either vanished
/// (`ProductNotFound`) or another terminal consumed the stock since the
/// cart was validated (`StockConflict` - the one retryable error).
pub(crate) async fn decrement_stock_checked(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE inventory
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(());
    }

    // Distinguish "gone" from "raced" for the caller's retry decision
    let current: Option<(String, i64)> =
        sqlx::query_as("SELECT name, stock FROM inventory WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        None => Err(CoreError::ProductNotFound(product_id.to_string()).into()),
        Some((name, available)) => Err(StoreError::StockConflict {
            name,
            available,
            requested: quantity,
        }),
    }
}

/// Restores stock released by a reversal, in the same transaction that
/// rewrites the sale.
///
/// A missing product is not an error here: the product may have been
/// deleted after the sale, and the reversal must still go through.
pub(crate) async fn restore_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE inventory
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        debug!(id = %product_id, quantity = %quantity, "Product gone, stock not restored");
    }

    Ok(())
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
