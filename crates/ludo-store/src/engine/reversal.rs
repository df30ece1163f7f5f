//! # Admin Reversal
//!
//! Administrative reduction or removal of a past sale's lines, restoring
//! inventory exactly.
//!
//! ## Atomicity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust_line_quantity(sale, line, new_qty)                             │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    clamp new_qty to [0, original]      (reversal can only reduce)     │
//! │    restored = original − new_qty                                       │
//! │    new_qty == 0 ? DELETE line : UPDATE line quantity + subtotal        │
//! │    UPDATE sale total + change from the remaining lines                 │
//! │    UPDATE inventory SET stock = stock + restored                       │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  A reader can never observe restored stock without the adjusted sale   │
//! │  or vice versa - both writes land in one transaction.                  │
//! │                                                                         │
//! │  No cash movement is written: the drawer effect of a reversal is       │
//! │  automatic the next time the ledger is evaluated over the adjusted     │
//! │  sale records.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::notify::EntityTable;
use crate::repository::{inventory, sale};
use ludo_core::{SaleLine, SaleWithLines};

use super::RegisterEngine;

impl RegisterEngine {
    /// Reduces one line of a past sale to `new_quantity`, restoring the
    /// difference to stock.
    ///
    /// `new_quantity` is clamped to `[0, original]` - this is the one
    /// place where clamping is allowed, since the bounds are displayed,
    /// not typed. At zero the line is removed entirely. The sale's total
    /// and change are recomputed from the remaining lines.
    pub async fn adjust_line_quantity(
        &self,
        sale_id: &str,
        line_id: &str,
        new_quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<SaleWithLines> {
        let mut tx = self.pool().begin().await?;

        let mut sale_row = sale::get_sale(&mut tx, sale_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Sale", sale_id))?;
        let lines = sale::get_sale_lines(&mut tx, sale_id).await?;

        let line = lines
            .iter()
            .find(|l| l.id == line_id)
            .ok_or_else(|| StoreError::not_found("Sale line", line_id))?;

        let clamped = new_quantity.clamp(0, line.quantity);
        let restored = line.quantity - clamped;

        let mut remaining: Vec<SaleLine> = Vec::with_capacity(lines.len());
        for l in &lines {
            if l.id != line_id {
                remaining.push(l.clone());
                continue;
            }
            if clamped == 0 {
                sale::delete_line(&mut tx, line_id).await?;
            } else {
                let subtotal = l.unit_price_cents * clamped;
                sale::update_line_quantity(&mut tx, line_id, clamped, subtotal).await?;
                let mut updated = l.clone();
                updated.quantity = clamped;
                updated.subtotal_cents = subtotal;
                remaining.push(updated);
            }
        }

        let new_total: i64 = remaining.iter().map(|l| l.subtotal_cents).sum();
        let new_change = sale_row.paid_cents - new_total;
        sale::update_sale_totals(&mut tx, sale_id, new_total, new_change).await?;

        if restored > 0 {
            if let Some(product_id) = &line.product_id {
                inventory::restore_stock(&mut tx, product_id, restored, now).await?;
            }
        }

        tx.commit().await?;

        self.publish(EntityTable::Sales);
        if restored > 0 {
            self.publish(EntityTable::Inventory);
        }

        info!(
            sale_id = %sale_id,
            line_id = %line_id,
            new_quantity = %clamped,
            restored = %restored,
            "Sale line adjusted"
        );

        sale_row.total_cents = new_total;
        sale_row.change_cents = new_change;
        Ok(SaleWithLines {
            sale: sale_row,
            lines: remaining,
        })
    }

    /// Deletes a past sale entirely, restoring every inventory-backed
    /// line's quantity to stock.
    ///
    /// The limiting case of line reversal: afterwards the ledger computes
    /// as if the sale had never existed.
    pub async fn delete_sale(&self, sale_id: &str, now: DateTime<Utc>) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;

        sale::get_sale(&mut tx, sale_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Sale", sale_id))?;
        let lines = sale::get_sale_lines(&mut tx, sale_id).await?;

        for line in &lines {
            if let Some(product_id) = &line.product_id {
                inventory::restore_stock(&mut tx, product_id, line.quantity, now).await?;
            }
        }

        sale::delete_sale(&mut tx, sale_id).await?;

        tx.commit().await?;

        self.publish(EntityTable::Sales);
        self.publish(EntityTable::Inventory);

        info!(sale_id = %sale_id, lines = lines.len(), "Sale deleted, stock restored");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use ludo_core::{Cart, PaymentMethod, Product};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seeded_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        db.engine()
            .create_product(name, price_cents, stock, Utc::now())
            .await
            .unwrap()
    }

    /// Sale with two lines: qty 2 @ $10.00 and qty 1 @ $20.00 (total $40.00).
    async fn two_line_sale(db: &Database) -> (Product, Product, SaleWithLines) {
        let a = seeded_product(db, "Producto A", 1000, 10).await;
        let b = seeded_product(db, "Producto B", 2000, 10).await;

        let mut cart = Cart::new();
        cart.add_product(&a, 2).unwrap();
        cart.add_product(&b, 1).unwrap();

        let sale = db
            .engine()
            .finalize_sale(&cart, PaymentMethod::Drawer, 4000, Utc::now())
            .await
            .unwrap();
        (a, b, sale)
    }

    /// Reversing the first line to zero: new total $20.00, first product's
    /// stock back up by 2.
    #[tokio::test]
    async fn test_reverse_line_to_zero() {
        let db = test_db().await;
        let engine = db.engine();
        let (a, _b, sold) = two_line_sale(&db).await;
        let line_a = sold
            .lines
            .iter()
            .find(|l| l.product_id.as_deref() == Some(a.id.as_str()))
            .unwrap();

        let adjusted = engine
            .adjust_line_quantity(&sold.sale.id, &line_a.id, 0, Utc::now())
            .await
            .unwrap();

        assert_eq!(adjusted.sale.total_cents, 2000);
        assert_eq!(adjusted.lines.len(), 1);
        // paid 40.00 stays, so change grows to 20.00
        assert_eq!(adjusted.sale.change_cents, 2000);

        let a_after = db.inventory().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(a_after.stock, 10); // 10 − 2 + 2

        // Persisted state matches the returned view
        let stored = db.sales().get_with_lines(&sold.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.sale.total_cents, 2000);
        assert_eq!(stored.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_reverse_line_partial_restores_exactly() {
        let db = test_db().await;
        let engine = db.engine();
        let (a, _b, sold) = two_line_sale(&db).await;
        let line_a = sold
            .lines
            .iter()
            .find(|l| l.product_id.as_deref() == Some(a.id.as_str()))
            .unwrap();

        let stock_before = db.inventory().get_by_id(&a.id).await.unwrap().unwrap().stock;

        // 2 → 1: exactly one unit restored
        let adjusted = engine
            .adjust_line_quantity(&sold.sale.id, &line_a.id, 1, Utc::now())
            .await
            .unwrap();

        let stock_after = db.inventory().get_by_id(&a.id).await.unwrap().unwrap().stock;
        assert_eq!(stock_after, stock_before + 1);

        let line_after = adjusted
            .lines
            .iter()
            .find(|l| l.id == line_a.id)
            .unwrap();
        assert_eq!(line_after.quantity, 1);
        assert_eq!(line_after.subtotal_cents, 1000);
        assert_eq!(adjusted.sale.total_cents, 3000);
        assert_eq!(adjusted.sale.change_cents, 1000);
    }

    /// Reversal can only reduce: a larger quantity clamps to the original
    /// and restores nothing.
    #[tokio::test]
    async fn test_reverse_line_clamps_to_original() {
        let db = test_db().await;
        let engine = db.engine();
        let (a, _b, sold) = two_line_sale(&db).await;
        let line_a = sold
            .lines
            .iter()
            .find(|l| l.product_id.as_deref() == Some(a.id.as_str()))
            .unwrap();

        let adjusted = engine
            .adjust_line_quantity(&sold.sale.id, &line_a.id, 99, Utc::now())
            .await
            .unwrap();

        assert_eq!(adjusted.sale.total_cents, 4000);
        let a_after = db.inventory().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(a_after.stock, 8); // unchanged since the sale

        // Negative clamps to zero: the line is removed
        let adjusted = engine
            .adjust_line_quantity(&sold.sale.id, &line_a.id, -5, Utc::now())
            .await
            .unwrap();
        assert_eq!(adjusted.lines.len(), 1);
        let a_after = db.inventory().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(a_after.stock, 10);
    }

    #[tokio::test]
    async fn test_reverse_missing_sale_or_line() {
        let db = test_db().await;
        let engine = db.engine();
        let (_a, _b, sold) = two_line_sale(&db).await;

        assert!(matches!(
            engine
                .adjust_line_quantity("missing", "x", 0, Utc::now())
                .await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            engine
                .adjust_line_quantity(&sold.sale.id, "missing", 0, Utc::now())
                .await,
            Err(StoreError::NotFound { .. })
        ));
    }

    /// Finalize + full reverse is stock-neutral and cash-invisible:
    /// afterwards the drawer balance equals the balance as if the sale
    /// had never existed.
    #[tokio::test]
    async fn test_delete_sale_is_true_inverse() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        let a = seeded_product(&db, "Producto A", 1000, 10).await;

        let balance_before = engine.current_totals(now).await.unwrap().drawer_balance;

        let mut cart = Cart::new();
        cart.add_product(&a, 3).unwrap();
        let sold = engine
            .finalize_sale(&cart, PaymentMethod::Drawer, 3000, now)
            .await
            .unwrap();

        let during = engine.current_totals(now).await.unwrap();
        assert_eq!(during.drawer_balance.cents(), balance_before.cents() + 3000);

        engine.delete_sale(&sold.sale.id, now).await.unwrap();

        let after = engine.current_totals(now).await.unwrap();
        assert_eq!(after.drawer_balance, balance_before);

        let a_after = db.inventory().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(a_after.stock, 10);
        assert_eq!(db.sales().count().await.unwrap(), 0);

        assert!(matches!(
            engine.delete_sale(&sold.sale.id, now).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reversal_writes_no_cash_movement() {
        let db = test_db().await;
        let engine = db.engine();
        let (a, _b, sold) = two_line_sale(&db).await;
        let line_a = sold
            .lines
            .iter()
            .find(|l| l.product_id.as_deref() == Some(a.id.as_str()))
            .unwrap();

        engine
            .adjust_line_quantity(&sold.sale.id, &line_a.id, 0, Utc::now())
            .await
            .unwrap();
        engine.delete_sale(&sold.sale.id, Utc::now()).await.unwrap();

        assert!(db.cash_moves().list().await.unwrap().is_empty());
    }

    /// A sale whose product was deleted afterwards can still be reversed;
    /// there is just no stock row left to restore into.
    #[tokio::test]
    async fn test_reversal_survives_deleted_product() {
        let db = test_db().await;
        let engine = db.engine();
        let (a, _b, sold) = two_line_sale(&db).await;

        engine.remove_product(&a.id).await.unwrap();

        engine.delete_sale(&sold.sale.id, Utc::now()).await.unwrap();
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    /// Service lines have no product reference; reversing them touches
    /// no inventory.
    #[tokio::test]
    async fn test_reverse_service_line_touches_no_stock() {
        let db = test_db().await;
        let engine = db.engine();

        let sold = engine
            .register_service_sale(
                &[ludo_core::ServiceItem {
                    name: "Visita 1-2 HRS".to_string(),
                    unit_price_cents: 8000,
                    quantity: 2,
                }],
                0,
                PaymentMethod::Drawer,
                16000,
                None,
                Utc::now(),
            )
            .await
            .unwrap();

        let adjusted = engine
            .adjust_line_quantity(&sold.sale.id, &sold.lines[0].id, 1, Utc::now())
            .await
            .unwrap();

        assert_eq!(adjusted.sale.total_cents, 8000);
        assert_eq!(adjusted.sale.change_cents, 8000);
    }

    #[tokio::test]
    async fn test_reverse_last_line_leaves_zero_total_sale() {
        let db = test_db().await;
        let engine = db.engine();

        let a = seeded_product(&db, "Producto A", 1000, 10).await;
        let mut cart = Cart::new();
        cart.add_product(&a, 1).unwrap();
        let sold = engine
            .finalize_sale(&cart, PaymentMethod::Drawer, 1000, Utc::now())
            .await
            .unwrap();

        let adjusted = engine
            .adjust_line_quantity(&sold.sale.id, &sold.lines[0].id, 0, Utc::now())
            .await
            .unwrap();

        // The record survives with no lines; delete_sale removes it
        assert!(adjusted.lines.is_empty());
        assert_eq!(adjusted.sale.total_cents, 0);
        assert_eq!(adjusted.sale.change_cents, 1000);
        assert_eq!(db.sales().count().await.unwrap(), 1);
    }
}
