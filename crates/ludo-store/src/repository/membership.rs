//! # Membership Price Repository
//!
//! The editable price list behind the service-sale buttons. Prices are
//! copied into sale lines at sale time, so edits here never change
//! historical totals - the table and the sales are deliberately not
//! transactional with each other.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::StoreResult;
use ludo_core::{MembershipPrice, MembershipPriceTable, ServiceCategory};

/// Repository for membership price operations.
#[derive(Debug, Clone)]
pub struct MembershipRepository {
    pool: SqlitePool,
}

impl MembershipRepository {
    /// Creates a new MembershipRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MembershipRepository { pool }
    }

    /// Reads the full price table.
    pub async fn table(&self) -> StoreResult<MembershipPriceTable> {
        let entries = sqlx::query_as::<_, MembershipPrice>(
            r#"
            SELECT service, tier, price_cents
            FROM membership_prices
            ORDER BY service, tier
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(MembershipPriceTable { entries })
    }

    /// Inserts or updates one (service, tier) price.
    pub async fn upsert(
        &self,
        service: ServiceCategory,
        tier: &str,
        price_cents: i64,
    ) -> StoreResult<()> {
        debug!(service = ?service, tier = %tier, price_cents = %price_cents, "Upserting membership price");

        sqlx::query(
            r#"
            INSERT INTO membership_prices (service, tier, price_cents)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (service, tier) DO UPDATE SET price_cents = ?3
            "#,
        )
        .bind(service)
        .bind(tier)
        .bind(price_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
