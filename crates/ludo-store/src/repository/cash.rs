//! # Cash Movement Repository
//!
//! Database operations for manual cash movements (drawer adjustments
//! outside of sales: change floats, petty-cash outflows, inventory
//! purchases).
//!
//! Movements are append-only. Nothing edits a movement; mistakes are
//! corrected with a compensating movement, and the only deletions happen
//! during period consolidation.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreResult;
use ludo_core::CashMovement;

const MOVE_COLUMNS: &str = "id, kind, concept, amount_cents, ts";

/// Repository for cash movement operations.
#[derive(Debug, Clone)]
pub struct CashMovementRepository {
    pool: SqlitePool,
}

impl CashMovementRepository {
    /// Creates a new CashMovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashMovementRepository { pool }
    }

    /// Appends a movement.
    pub async fn insert(&self, movement: &CashMovement) -> StoreResult<()> {
        debug!(
            id = %movement.id,
            kind = ?movement.kind,
            amount = %movement.amount_cents,
            "Recording cash movement"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_moves (id, kind, concept, amount_cents, ts)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&movement.id)
        .bind(movement.kind)
        .bind(&movement.concept)
        .bind(movement.amount_cents)
        .bind(movement.ts)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists all movements, newest first.
    pub async fn list(&self) -> StoreResult<Vec<CashMovement>> {
        let moves = sqlx::query_as::<_, CashMovement>(&format!(
            "SELECT {MOVE_COLUMNS} FROM cash_moves ORDER BY ts DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(moves)
    }

    /// Lists movements with `ts >= since`, newest first.
    pub async fn list_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<CashMovement>> {
        let moves = sqlx::query_as::<_, CashMovement>(&format!(
            "SELECT {MOVE_COLUMNS} FROM cash_moves WHERE ts >= ?1 ORDER BY ts DESC"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(moves)
    }

    /// Lists movements in `[start, end)`, newest first.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<CashMovement>> {
        let moves = sqlx::query_as::<_, CashMovement>(&format!(
            "SELECT {MOVE_COLUMNS} FROM cash_moves WHERE ts >= ?1 AND ts < ?2 ORDER BY ts DESC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(moves)
    }
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Appends a movement inside an engine transaction (replenish-with-cost).
pub(crate) async fn insert_tx(
    conn: &mut SqliteConnection,
    movement: &CashMovement,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cash_moves (id, kind, concept, amount_cents, ts)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&movement.id)
    .bind(movement.kind)
    .bind(&movement.concept)
    .bind(movement.amount_cents)
    .bind(movement.ts)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Reads movements with `ts >= since` inside a day-close transaction.
pub(crate) async fn list_since_tx(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> StoreResult<Vec<CashMovement>> {
    let moves = sqlx::query_as::<_, CashMovement>(&format!(
        "SELECT {MOVE_COLUMNS} FROM cash_moves WHERE ts >= ?1 ORDER BY ts"
    ))
    .bind(since)
    .fetch_all(&mut *conn)
    .await?;

    Ok(moves)
}

/// Reads movements in `[start, end)` inside a consolidation transaction.
pub(crate) async fn list_between_tx(
    conn: &mut SqliteConnection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> StoreResult<Vec<CashMovement>> {
    let moves = sqlx::query_as::<_, CashMovement>(&format!(
        "SELECT {MOVE_COLUMNS} FROM cash_moves WHERE ts >= ?1 AND ts < ?2 ORDER BY ts"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;

    Ok(moves)
}

/// Purges movements with `ts >= since` (day close).
pub(crate) async fn delete_since(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM cash_moves WHERE ts >= ?1")
        .bind(since)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Purges movements in `[start, end)` (month consolidation).
pub(crate) async fn delete_between(
    conn: &mut SqliteConnection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM cash_moves WHERE ts >= ?1 AND ts < ?2")
        .bind(start)
        .bind(end)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Generates a new movement ID.
pub fn generate_movement_id() -> String {
    Uuid::new_v4().to_string()
}
