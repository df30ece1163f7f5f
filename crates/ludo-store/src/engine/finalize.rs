//! # Sale Finalizer
//!
//! Converts a validated cart into a persisted sale with an atomic stock
//! decrement, and registers service (non-inventory) sales.
//!
//! ## Finalize Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  finalize_sale(cart, method, paid)                                     │
//! │                                                                         │
//! │  1. Drop zero-quantity lines; reject an empty cart                     │
//! │  2. Recompute the total from the lines (never trust a caller total)   │
//! │  3. Reject paid < total - insufficient payment is never clamped        │
//! │  4. BEGIN                                                              │
//! │       per inventory line:                                              │
//! │         UPDATE inventory SET stock = stock - q                         │
//! │         WHERE id = ? AND stock >= q        ← the atomic guard          │
//! │       INSERT sale, INSERT lines                                        │
//! │     COMMIT                                                             │
//! │  5. Any guard failure rolls the WHOLE transaction back:                │
//! │     no partial decrement, no partial sale record                       │
//! │                                                                         │
//! │  No cash movement is written: drawer sales are derived from            │
//! │  Sale.total + Sale.method by the ledger, never double-entered.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::StoreResult;
use crate::notify::EntityTable;
use crate::repository::{inventory, sale};
use ludo_core::validation;
use ludo_core::{
    Cart, CoreError, Money, PaymentMethod, Sale, SaleLine, SaleWithLines, ServiceItem,
};

use super::RegisterEngine;

impl RegisterEngine {
    /// Finalizes a cart into a persisted sale.
    ///
    /// ## Errors
    /// - [`CoreError::EmptyCart`] - no effective lines
    /// - [`CoreError::InsufficientPayment`] - `paid < total`
    /// - [`CoreError::ProductNotFound`] - a line's product vanished
    /// - [`crate::StoreError::StockConflict`] - lost a stock race; retry
    ///   the whole finalize
    ///
    /// On any error the store is left exactly as it was.
    pub async fn finalize_sale(
        &self,
        cart: &Cart,
        method: PaymentMethod,
        paid_cents: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<SaleWithLines> {
        let lines = cart.effective_lines();
        if lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        for line in &lines {
            validation::validate_quantity(line.quantity).map_err(CoreError::from)?;
        }

        // The total comes from the cart's current state, nothing else
        let total = cart.total();
        if paid_cents < total.cents() {
            return Err(CoreError::InsufficientPayment {
                total_cents: total.cents(),
                paid_cents,
            }
            .into());
        }

        let sale = Sale {
            id: sale::generate_sale_id(),
            ts: now,
            method,
            total_cents: total.cents(),
            paid_cents,
            change_cents: paid_cents - total.cents(),
            note: None,
        };

        let mut tx = self.pool().begin().await?;

        // Check-and-decrement per inventory-backed line. A failure here
        // drops the transaction and nothing below ever happened.
        for line in &lines {
            if let Some(product_id) = &line.product_id {
                inventory::decrement_stock_checked(&mut tx, product_id, line.quantity, now)
                    .await?;
            }
        }

        sale::insert_sale(&mut tx, &sale).await?;

        let mut sale_lines = Vec::with_capacity(lines.len());
        for line in &lines {
            let sale_line = SaleLine {
                id: sale::generate_line_id(),
                sale_id: sale.id.clone(),
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                subtotal_cents: line.subtotal().cents(),
            };
            sale::insert_line(&mut tx, &sale_line).await?;
            sale_lines.push(sale_line);
        }

        tx.commit().await?;

        self.publish(EntityTable::Sales);
        self.publish(EntityTable::Inventory);

        info!(
            sale_id = %sale.id,
            total = %sale.total(),
            change = %sale.change(),
            lines = sale_lines.len(),
            "Sale finalized"
        );

        Ok(SaleWithLines {
            sale,
            lines: sale_lines,
        })
    }

    /// Registers a service (non-inventory) sale.
    ///
    /// Same contract as [`RegisterEngine::finalize_sale`] minus the stock
    /// step: lines carry no product reference and nothing is decremented.
    /// A percentage discount is applied to the gross subtotal before the
    /// tender check; a non-zero discount requires a reason, which is
    /// recorded in the sale note.
    pub async fn register_service_sale(
        &self,
        items: &[ServiceItem],
        discount_pct: u32,
        method: PaymentMethod,
        paid_cents: i64,
        discount_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<SaleWithLines> {
        if items.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        validation::validate_discount_pct(discount_pct).map_err(CoreError::from)?;
        for item in items {
            validation::validate_name(&item.name).map_err(CoreError::from)?;
            validation::validate_quantity(item.quantity).map_err(CoreError::from)?;
            validation::validate_price_cents(item.unit_price_cents).map_err(CoreError::from)?;
        }

        let gross: Money = items.iter().map(ServiceItem::subtotal).sum();
        let total = gross.apply_percentage_discount(discount_pct * 100);

        let note = if discount_pct > 0 {
            let reason = discount_reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or(CoreError::Validation(
                    ludo_core::ValidationError::Required {
                        field: "discount reason".to_string(),
                    },
                ))?;
            Some(format!("Discount {discount_pct}%: {reason}"))
        } else {
            None
        };

        if paid_cents < total.cents() {
            return Err(CoreError::InsufficientPayment {
                total_cents: total.cents(),
                paid_cents,
            }
            .into());
        }

        let sale = Sale {
            id: sale::generate_sale_id(),
            ts: now,
            method,
            total_cents: total.cents(),
            paid_cents,
            change_cents: paid_cents - total.cents(),
            note,
        };

        let mut tx = self.pool().begin().await?;

        sale::insert_sale(&mut tx, &sale).await?;

        let mut sale_lines = Vec::with_capacity(items.len());
        for item in items {
            let sale_line = SaleLine {
                id: sale::generate_line_id(),
                sale_id: sale.id.clone(),
                product_id: None,
                name: item.name.clone(),
                unit_price_cents: item.unit_price_cents,
                quantity: item.quantity,
                subtotal_cents: item.subtotal().cents(),
            };
            sale::insert_line(&mut tx, &sale_line).await?;
            sale_lines.push(sale_line);
        }

        tx.commit().await?;

        self.publish(EntityTable::Sales);

        info!(
            sale_id = %sale.id,
            total = %sale.total(),
            discount_pct = %discount_pct,
            "Service sale registered"
        );

        Ok(SaleWithLines {
            sale,
            lines: sale_lines,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::pool::{Database, DbConfig};
    use ludo_core::Product;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seeded_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        db.engine()
            .create_product(name, price_cents, stock, Utc::now())
            .await
            .unwrap()
    }

    fn cart_with(product: &Product, qty: i64) -> Cart {
        let mut cart = Cart::new();
        cart.add_product(product, qty).unwrap();
        cart
    }

    #[tokio::test]
    async fn test_finalize_decrements_stock_and_persists() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        let agua = seeded_product(&db, "Agua 600 ml", 1200, 30).await;
        let sabritas = seeded_product(&db, "Sabritas 45 g", 1700, 25).await;

        let mut cart = Cart::new();
        cart.add_product(&agua, 2).unwrap();
        cart.add_product(&sabritas, 1).unwrap();

        // Total 2×12.00 + 17.00 = 41.00, paid 50.00
        let result = engine
            .finalize_sale(&cart, PaymentMethod::Drawer, 5000, now)
            .await
            .unwrap();

        assert_eq!(result.sale.total_cents, 4100);
        assert_eq!(result.sale.change_cents, 900);
        assert_eq!(result.lines.len(), 2);

        let agua_after = db.inventory().get_by_id(&agua.id).await.unwrap().unwrap();
        let sabritas_after = db.inventory().get_by_id(&sabritas.id).await.unwrap().unwrap();
        assert_eq!(agua_after.stock, 28);
        assert_eq!(sabritas_after.stock, 24);

        let stored = db.sales().get_with_lines(&result.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.sale.total_cents, 4100);
        assert_eq!(stored.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_finalize_exact_tender_zero_change() {
        let db = test_db().await;
        let engine = db.engine();
        let agua = seeded_product(&db, "Agua 600 ml", 1200, 30).await;

        let result = engine
            .finalize_sale(&cart_with(&agua, 1), PaymentMethod::Drawer, 1200, Utc::now())
            .await
            .unwrap();

        assert_eq!(result.sale.change_cents, 0);
    }

    #[tokio::test]
    async fn test_finalize_one_cent_short_rejected() {
        let db = test_db().await;
        let engine = db.engine();
        let agua = seeded_product(&db, "Agua 600 ml", 1200, 30).await;

        let err = engine
            .finalize_sale(&cart_with(&agua, 1), PaymentMethod::Drawer, 1199, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Core(CoreError::InsufficientPayment {
                total_cents: 1200,
                paid_cents: 1199,
            })
        ));

        // Nothing moved
        let after = db.inventory().get_by_id(&agua.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 30);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_finalize_empty_cart_rejected() {
        let db = test_db().await;
        let engine = db.engine();

        let err = engine
            .finalize_sale(&Cart::new(), PaymentMethod::Drawer, 1000, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::EmptyCart)));

        // A cart whose lines were all edited to zero counts as empty too
        let db = test_db().await;
        let engine = db.engine();
        let agua = seeded_product(&db, "Agua 600 ml", 1200, 30).await;
        let mut cart = cart_with(&agua, 2);
        cart.set_quantity(&agua.id, 0).unwrap();

        let err = engine
            .finalize_sale(&cart, PaymentMethod::Drawer, 1000, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_finalize_stale_cart_loses_stock_race() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        let agua = seeded_product(&db, "Agua 600 ml", 1200, 5).await;

        // Cart validated while stock was 5
        let cart = cart_with(&agua, 4);

        // Another terminal sells 3 units in the meantime
        let other_cart = cart_with(&agua, 3);
        engine
            .finalize_sale(&other_cart, PaymentMethod::Drawer, 3600, now)
            .await
            .unwrap();

        // Our finalize now loses the conditional update
        let err = engine
            .finalize_sale(&cart, PaymentMethod::Drawer, 4800, now)
            .await
            .unwrap_err();

        match err {
            StoreError::StockConflict {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 4);
                assert!(StoreError::StockConflict {
                    name: String::new(),
                    available,
                    requested
                }
                .is_retryable());
            }
            other => panic!("expected StockConflict, got {other:?}"),
        }

        // Only the first sale exists; stock reflects it exactly
        assert_eq!(db.sales().count().await.unwrap(), 1);
        let after = db.inventory().get_by_id(&agua.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 2);
    }

    /// All-or-nothing: when the second line fails the guard, the first
    /// line's decrement is rolled back too.
    #[tokio::test]
    async fn test_finalize_partial_failure_rolls_back_everything() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        let agua = seeded_product(&db, "Agua 600 ml", 1200, 30).await;
        let leche = seeded_product(&db, "Leche Santa Clara 1 L", 3200, 2).await;

        let mut cart = Cart::new();
        cart.add_product(&agua, 2).unwrap();
        cart.add_product(&leche, 2).unwrap();

        // Drain leche behind the cart's back
        engine
            .finalize_sale(&cart_with(&leche, 2), PaymentMethod::Drawer, 6400, now)
            .await
            .unwrap();

        let err = engine
            .finalize_sale(&cart, PaymentMethod::Drawer, 10000, now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StockConflict { .. }));

        // Agua's decrement did not survive the rollback
        let agua_after = db.inventory().get_by_id(&agua.id).await.unwrap().unwrap();
        assert_eq!(agua_after.stock, 30);
        assert_eq!(db.sales().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_finalize_deleted_product_reports_not_found() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        let agua = seeded_product(&db, "Agua 600 ml", 1200, 30).await;
        let cart = cart_with(&agua, 1);

        engine.remove_product(&agua.id).await.unwrap();

        let err = engine
            .finalize_sale(&cart, PaymentMethod::Drawer, 1200, now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_finalize_writes_no_cash_movement() {
        let db = test_db().await;
        let engine = db.engine();
        let agua = seeded_product(&db, "Agua 600 ml", 1200, 30).await;

        engine
            .finalize_sale(&cart_with(&agua, 1), PaymentMethod::Drawer, 1200, Utc::now())
            .await
            .unwrap();

        // Drawer sales derive from the sale record, never double-entered
        assert!(db.cash_moves().list().await.unwrap().is_empty());
    }

    fn service_items() -> Vec<ServiceItem> {
        vec![
            ServiceItem {
                name: "Visita 1-2 HRS".to_string(),
                unit_price_cents: 8000,
                quantity: 2,
            },
            ServiceItem {
                name: "Paquete 1".to_string(),
                unit_price_cents: 45000,
                quantity: 1,
            },
        ]
    }

    #[tokio::test]
    async fn test_service_sale_without_discount() {
        let db = test_db().await;
        let engine = db.engine();

        // Gross 2×80.00 + 450.00 = 610.00
        let result = engine
            .register_service_sale(
                &service_items(),
                0,
                PaymentMethod::Drawer,
                61000,
                None,
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(result.sale.total_cents, 61000);
        assert_eq!(result.sale.note, None);
        assert!(result.lines.iter().all(|l| l.product_id.is_none()));
    }

    #[tokio::test]
    async fn test_service_sale_discount_recorded_in_note() {
        let db = test_db().await;
        let engine = db.engine();

        // 610.00 gross, 10% off = 549.00
        let result = engine
            .register_service_sale(
                &service_items(),
                10,
                PaymentMethod::Transfer,
                54900,
                Some("Sibling promo"),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(result.sale.total_cents, 54900);
        assert_eq!(result.sale.change_cents, 0);
        assert_eq!(
            result.sale.note.as_deref(),
            Some("Discount 10%: Sibling promo")
        );
    }

    #[tokio::test]
    async fn test_service_sale_tender_checked_against_discounted_total() {
        let db = test_db().await;
        let engine = db.engine();

        // Net is 549.00; paying the net minus one cent fails
        let err = engine
            .register_service_sale(
                &service_items(),
                10,
                PaymentMethod::Drawer,
                54899,
                Some("Sibling promo"),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::InsufficientPayment { .. })
        ));

        // Paying the gross is plenty
        engine
            .register_service_sale(
                &service_items(),
                10,
                PaymentMethod::Drawer,
                61000,
                Some("Sibling promo"),
                Utc::now(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_service_sale_discount_requires_reason() {
        let db = test_db().await;
        let engine = db.engine();

        let err = engine
            .register_service_sale(
                &service_items(),
                10,
                PaymentMethod::Drawer,
                61000,
                None,
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::Validation(_))
        ));

        let err = engine
            .register_service_sale(
                &service_items(),
                101,
                PaymentMethod::Drawer,
                61000,
                Some("too much"),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_service_sale_empty_items_rejected() {
        let db = test_db().await;
        let engine = db.engine();

        let err = engine
            .register_service_sale(&[], 0, PaymentMethod::Drawer, 1000, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::EmptyCart)));
    }
}
