//! # Sale Repository
//!
//! Database operations for sales and sale lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. FINALIZE (engine)                                                  │
//! │     └── sale + lines inserted atomically with the stock decrement      │
//! │                                                                         │
//! │  2. (OPTIONAL) ADMIN REVERSAL (engine)                                 │
//! │     └── line shrunk/removed, totals rewritten, stock restored          │
//! │                                                                         │
//! │  3. PERIOD CONSOLIDATION (engine)                                      │
//! │     └── day close / month export purge the window                      │
//! │                                                                         │
//! │  There is no draft state: a sale row exists only once it is final.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::StoreResult;
use ludo_core::{Sale, SaleLine, SaleWithLines};

const SALE_COLUMNS: &str = "id, ts, method, total_cents, paid_cents, change_cents, note";
const LINE_COLUMNS: &str = "id, sale_id, product_id, name, unit_price_cents, quantity, subtotal_cents";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale with its lines.
    pub async fn get_with_lines(&self, id: &str) -> StoreResult<Option<SaleWithLines>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let lines = self.get_lines(id).await?;
        Ok(Some(SaleWithLines { sale, lines }))
    }

    /// Gets all lines for a sale, in insertion order.
    pub async fn get_lines(&self, sale_id: &str) -> StoreResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Lists all sales with their lines, newest first.
    ///
    /// Two queries, joined in memory: the line table is fetched once and
    /// grouped by sale id.
    pub async fn list(&self) -> StoreResult<Vec<SaleWithLines>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY ts DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(group_lines(sales, lines))
    }

    /// Lists sales with `ts >= since`, newest first.
    pub async fn list_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE ts >= ?1 ORDER BY ts DESC"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists sales in `[start, end)`, newest first.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE ts >= ?1 AND ts < ?2 ORDER BY ts DESC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists sales with lines for `ts >= since`, newest first.
    ///
    /// Feeds the day-close per-product summary.
    pub async fn list_since_with_lines(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<SaleWithLines>> {
        let sales = self.list_since(since).await?;

        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            r#"
            SELECT {LINE_COLUMNS} FROM sale_lines
            WHERE sale_id IN (SELECT id FROM sales WHERE ts >= ?1)
            ORDER BY rowid
            "#
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(group_lines(sales, lines))
    }

    /// Counts sales (for diagnostics).
    pub async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn group_lines(sales: Vec<Sale>, lines: Vec<SaleLine>) -> Vec<SaleWithLines> {
    let mut by_sale: HashMap<String, Vec<SaleLine>> = HashMap::new();
    for line in lines {
        by_sale.entry(line.sale_id.clone()).or_default().push(line);
    }

    sales
        .into_iter()
        .map(|sale| {
            let lines = by_sale.remove(&sale.id).unwrap_or_default();
            SaleWithLines { sale, lines }
        })
        .collect()
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================
// Used inside engine transactions; never exposed outside the crate.

/// Inserts a sale row.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (id, ts, method, total_cents, paid_cents, change_cents, note)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.ts)
    .bind(sale.method)
    .bind(sale.total_cents)
    .bind(sale.paid_cents)
    .bind(sale.change_cents)
    .bind(&sale.note)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a sale line.
pub(crate) async fn insert_line(conn: &mut SqliteConnection, line: &SaleLine) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_lines (id, sale_id, product_id, name, unit_price_cents, quantity, subtotal_cents)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&line.id)
    .bind(&line.sale_id)
    .bind(&line.product_id)
    .bind(&line.name)
    .bind(line.unit_price_cents)
    .bind(line.quantity)
    .bind(line.subtotal_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Reads a sale row inside a transaction.
pub(crate) async fn get_sale(
    conn: &mut SqliteConnection,
    id: &str,
) -> StoreResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(sale)
}

/// Reads a sale's lines inside a transaction.
pub(crate) async fn get_sale_lines(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> StoreResult<Vec<SaleLine>> {
    let lines = sqlx::query_as::<_, SaleLine>(&format!(
        "SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY rowid"
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

/// Reads sales with `ts >= since` inside a day-close transaction, so the
/// balance is computed over exactly the window that gets purged.
pub(crate) async fn list_since_tx(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> StoreResult<Vec<Sale>> {
    let sales = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE ts >= ?1 ORDER BY ts"
    ))
    .bind(since)
    .fetch_all(&mut *conn)
    .await?;

    Ok(sales)
}

/// Reads sales in `[start, end)` inside a consolidation transaction.
pub(crate) async fn list_between_tx(
    conn: &mut SqliteConnection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> StoreResult<Vec<Sale>> {
    let sales = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE ts >= ?1 AND ts < ?2 ORDER BY ts"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;

    Ok(sales)
}

/// Rewrites a line's quantity and subtotal after a reversal.
pub(crate) async fn update_line_quantity(
    conn: &mut SqliteConnection,
    line_id: &str,
    quantity: i64,
    subtotal_cents: i64,
) -> StoreResult<()> {
    sqlx::query("UPDATE sale_lines SET quantity = ?2, subtotal_cents = ?3 WHERE id = ?1")
        .bind(line_id)
        .bind(quantity)
        .bind(subtotal_cents)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Removes a line entirely (reversal to quantity zero).
pub(crate) async fn delete_line(conn: &mut SqliteConnection, line_id: &str) -> StoreResult<()> {
    sqlx::query("DELETE FROM sale_lines WHERE id = ?1")
        .bind(line_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Rewrites a sale's total and change after a reversal.
pub(crate) async fn update_sale_totals(
    conn: &mut SqliteConnection,
    sale_id: &str,
    total_cents: i64,
    change_cents: i64,
) -> StoreResult<()> {
    sqlx::query("UPDATE sales SET total_cents = ?2, change_cents = ?3 WHERE id = ?1")
        .bind(sale_id)
        .bind(total_cents)
        .bind(change_cents)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Deletes a sale; its lines cascade.
pub(crate) async fn delete_sale(conn: &mut SqliteConnection, sale_id: &str) -> StoreResult<()> {
    sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Purges sales with `ts >= since` (day close). Lines cascade.
pub(crate) async fn delete_since(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM sales WHERE ts >= ?1")
        .bind(since)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Purges sales in `[start, end)` (month consolidation). Lines cascade.
pub(crate) async fn delete_between(
    conn: &mut SqliteConnection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM sales WHERE ts >= ?1 AND ts < ?2")
        .bind(start)
        .bind(end)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale line ID.
pub fn generate_line_id() -> String {
    Uuid::new_v4().to_string()
}
