//! # Register Engine
//!
//! The transactional heart of Ludo POS: every operation that mutates
//! sales, stock, cash movements, or the register state goes through this
//! facade.
//!
//! ## Operation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RegisterEngine                                   │
//! │                                                                         │
//! │  finalize.rs    finalize_sale()          cart → sale + stock decrement │
//! │                 register_service_sale()  service items → sale           │
//! │                                                                         │
//! │  reversal.rs    adjust_line_quantity()   shrink line, restore stock    │
//! │                 delete_sale()            remove sale, restore stock    │
//! │                                                                         │
//! │  period.rs      close_day()              roll balance, purge day       │
//! │                 month_summary()          read-only month report        │
//! │                 consolidate_month()      export, then purge month      │
//! │                                                                         │
//! │  mod.rs         catalog + cash maintenance (create/replenish/price/    │
//! │                 delete product, manual movements, membership prices)   │
//! │                                                                         │
//! │  Exactly two operations need cross-terminal atomicity: the stock       │
//! │  check-and-decrement in finalize and the restore-plus-rewrite in       │
//! │  reversal. Both are single SQLite transactions built on conditional    │
//! │  updates - never read-then-write.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! After every committed mutation the engine publishes a best-effort
//! change event so other terminals can refresh; correctness never
//! depends on those events arriving.

mod finalize;
mod period;
mod reversal;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{StoreResult, StoreError};
use crate::notify::{ChangeFeed, EntityTable};
use crate::repository::{cash, inventory};
use crate::repository::cash::CashMovementRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::membership::MembershipRepository;
use crate::repository::register::RegisterRepository;
use crate::repository::sale::SaleRepository;
use ludo_core::ledger::{self, RegisterTotals};
use ludo_core::validation;
use ludo_core::{CashMovement, CoreError, MovementKind, Product, ServiceCategory};

/// The transactional engine over one store.
///
/// Cheap to clone and to construct per call ([`crate::Database::engine`]);
/// all state lives in the pool and the shared change feed.
#[derive(Debug, Clone)]
pub struct RegisterEngine {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl RegisterEngine {
    /// Creates an engine over a pool and change feed.
    pub(crate) fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        RegisterEngine { pool, changes }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) fn publish(&self, table: EntityTable) {
        self.changes.publish(table);
    }

    fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    fn cash_moves(&self) -> CashMovementRepository {
        CashMovementRepository::new(self.pool.clone())
    }

    fn register(&self) -> RegisterRepository {
        RegisterRepository::new(self.pool.clone())
    }

    fn membership(&self) -> MembershipRepository {
        MembershipRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Ledger View
    // =========================================================================

    /// Computes the register totals for the currently open day.
    ///
    /// Loads the history since the register was opened and hands it to
    /// the core ledger - this is a snapshot recompute, safe to call at
    /// any time from any terminal.
    pub async fn current_totals(&self, now: DateTime<Utc>) -> StoreResult<RegisterTotals> {
        let state = self.register().get_or_init(now).await?;
        let sales = self.sales().list_since(state.opened_at).await?;
        let moves = self.cash_moves().list_since(state.opened_at).await?;

        Ok(ledger::register_totals(
            &sales,
            &moves,
            state.opening_balance(),
        ))
    }

    // =========================================================================
    // Catalog Maintenance
    // =========================================================================

    /// Creates a product.
    pub async fn create_product(
        &self,
        name: &str,
        price_cents: i64,
        stock: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        validation::validate_name(name).map_err(CoreError::from)?;
        validation::validate_price_cents(price_cents).map_err(CoreError::from)?;
        validation::validate_stock(stock).map_err(CoreError::from)?;

        let product = Product {
            id: inventory::generate_product_id(),
            name: name.trim().to_string(),
            price_cents,
            stock,
            created_at: now,
            updated_at: now,
        };

        self.inventory().insert(&product).await?;
        self.publish(EntityTable::Inventory);

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Updates a product's price. Historical sales keep their snapshots.
    pub async fn update_price(
        &self,
        product_id: &str,
        price_cents: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        validation::validate_price_cents(price_cents).map_err(CoreError::from)?;

        self.inventory()
            .update_price(product_id, price_cents, now)
            .await?;
        self.publish(EntityTable::Inventory);

        Ok(())
    }

    /// Restocks a product, optionally recording what the restock cost.
    ///
    /// A positive `cost_cents` appends a purchase-kind cash movement in
    /// the same transaction, so the drawer and the shelf move together.
    pub async fn replenish(
        &self,
        product_id: &str,
        quantity: i64,
        cost_cents: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                requested: quantity,
            }
            .into());
        }
        if cost_cents < 0 {
            return Err(CoreError::from(ludo_core::ValidationError::OutOfRange {
                field: "cost".to_string(),
                min: 0,
                max: i64::MAX,
            })
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE inventory SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", product_id));
        }

        if cost_cents > 0 {
            let movement = CashMovement {
                id: cash::generate_movement_id(),
                kind: MovementKind::Purchase,
                concept: "Inventory purchase".to_string(),
                amount_cents: cost_cents,
                ts: now,
            };
            cash::insert_tx(&mut tx, &movement).await?;
        }

        tx.commit().await?;

        self.publish(EntityTable::Inventory);
        if cost_cents > 0 {
            self.publish(EntityTable::CashMoves);
        }

        info!(id = %product_id, quantity = %quantity, cost_cents = %cost_cents, "Product replenished");
        Ok(())
    }

    /// Hard-deletes a product. Historical sale lines keep their snapshots
    /// and are never touched.
    pub async fn remove_product(&self, product_id: &str) -> StoreResult<()> {
        self.inventory().delete(product_id).await?;
        self.publish(EntityTable::Inventory);

        info!(id = %product_id, "Product removed");
        Ok(())
    }

    // =========================================================================
    // Manual Cash Movements
    // =========================================================================

    /// Records a manual drawer adjustment.
    pub async fn record_movement(
        &self,
        kind: MovementKind,
        concept: &str,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<CashMovement> {
        validation::validate_concept(concept).map_err(CoreError::from)?;
        validation::validate_amount_cents(amount_cents).map_err(CoreError::from)?;

        let movement = CashMovement {
            id: cash::generate_movement_id(),
            kind,
            concept: concept.trim().to_string(),
            amount_cents,
            ts: now,
        };

        self.cash_moves().insert(&movement).await?;
        self.publish(EntityTable::CashMoves);

        info!(id = %movement.id, kind = ?kind, amount = %amount_cents, "Cash movement recorded");
        Ok(movement)
    }

    // =========================================================================
    // Membership Prices
    // =========================================================================

    /// Sets the price of one (service, tier) membership entry.
    pub async fn set_membership_price(
        &self,
        service: ServiceCategory,
        tier: &str,
        price_cents: i64,
    ) -> StoreResult<()> {
        if tier.trim().is_empty() {
            return Err(CoreError::from(ludo_core::ValidationError::Required {
                field: "tier".to_string(),
            })
            .into());
        }
        validation::validate_price_cents(price_cents).map_err(CoreError::from)?;

        self.membership()
            .upsert(service, tier.trim(), price_cents)
            .await?;
        self.publish(EntityTable::MembershipPrices);

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

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list_products() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        engine
            .create_product("Agua 600 ml", 1200, 30, now)
            .await
            .unwrap();
        engine
            .create_product("Sabritas 45 g", 1700, 25, now)
            .await
            .unwrap();

        let products = db.inventory().list().await.unwrap();
        assert_eq!(products.len(), 2);
        // Ordered by name
        assert_eq!(products[0].name, "Agua 600 ml");
    }

    #[tokio::test]
    async fn test_create_product_validation() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        assert!(engine.create_product("", 1200, 30, now).await.is_err());
        assert!(engine.create_product("Agua", -1, 30, now).await.is_err());
        assert!(engine.create_product("Agua", 1200, -1, now).await.is_err());
        assert_eq!(db.inventory().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_price_keeps_stock() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        let product = engine
            .create_product("Agua 600 ml", 1200, 30, now)
            .await
            .unwrap();
        engine.update_price(&product.id, 1400, now).await.unwrap();

        let updated = db.inventory().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(updated.price_cents, 1400);
        assert_eq!(updated.stock, 30);

        assert!(matches!(
            engine.update_price("missing", 100, now).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_replenish_with_cost_records_purchase() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        let product = engine
            .create_product("Huevo Finder docena", 4800, 10, now)
            .await
            .unwrap();

        engine.replenish(&product.id, 12, 36000, now).await.unwrap();

        let updated = db.inventory().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(updated.stock, 22);

        let moves = db.cash_moves().list().await.unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].kind, MovementKind::Purchase);
        assert_eq!(moves[0].amount_cents, 36000);
    }

    #[tokio::test]
    async fn test_replenish_without_cost_records_nothing() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        let product = engine
            .create_product("Agua 600 ml", 1200, 30, now)
            .await
            .unwrap();
        engine.replenish(&product.id, 6, 0, now).await.unwrap();

        assert!(db.cash_moves().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replenish_rejects_nonpositive_quantity() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        let product = engine
            .create_product("Agua 600 ml", 1200, 30, now)
            .await
            .unwrap();

        assert!(engine.replenish(&product.id, 0, 0, now).await.is_err());
        let unchanged = db.inventory().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stock, 30);
    }

    #[tokio::test]
    async fn test_record_movement_validation() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        assert!(engine
            .record_movement(MovementKind::Inflow, "", 1000, now)
            .await
            .is_err());
        assert!(engine
            .record_movement(MovementKind::Inflow, "Change float", 0, now)
            .await
            .is_err());

        engine
            .record_movement(MovementKind::Inflow, "Change float", 20000, now)
            .await
            .unwrap();
        assert_eq!(db.cash_moves().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_membership_price_upsert() {
        let db = test_db().await;
        let engine = db.engine();

        engine
            .set_membership_price(ServiceCategory::Playroom, "v12", 8000)
            .await
            .unwrap();
        engine
            .set_membership_price(ServiceCategory::Playroom, "v12", 9000)
            .await
            .unwrap();

        let table = db.membership().table().await.unwrap();
        assert_eq!(table.entries.len(), 1);
        assert_eq!(
            table
                .price_of(ServiceCategory::Playroom, "v12")
                .unwrap()
                .cents(),
            9000
        );
    }

    #[tokio::test]
    async fn test_current_totals_empty_store() {
        let db = test_db().await;
        let engine = db.engine();
        let now = Utc::now();

        let totals = engine.current_totals(now).await.unwrap();
        assert!(totals.drawer_balance.is_zero());
        assert!(totals.total_sales.is_zero());
    }
}
