//! # Register State Repository
//!
//! The register state is a single well-known row: the drawer's opening
//! balance and when the current day began. It is read everywhere the
//! ledger is evaluated and written only by day close.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::StoreResult;
use ludo_core::{RegisterState, REGISTER_ID};

/// Repository for the singleton register state.
#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    /// Creates a new RegisterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    /// Gets the register state, creating the default row on first use
    /// (zero opening balance, day opened now).
    pub async fn get_or_init(&self, now: DateTime<Utc>) -> StoreResult<RegisterState> {
        if let Some(state) = self.get().await? {
            return Ok(state);
        }

        debug!("Initializing register state");

        // Another terminal may have initialized concurrently; the insert
        // is a no-op in that case and we read whatever won.
        sqlx::query(
            r#"
            INSERT INTO register_state (id, start_cash_cents, opened_at)
            VALUES (?1, 0, ?2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(REGISTER_ID)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let state = sqlx::query_as::<_, RegisterState>(
            "SELECT id, start_cash_cents, opened_at FROM register_state WHERE id = ?1",
        )
        .bind(REGISTER_ID)
        .fetch_one(&self.pool)
        .await?;

        Ok(state)
    }

    /// Gets the register state, if initialized.
    pub async fn get(&self) -> StoreResult<Option<RegisterState>> {
        let state = sqlx::query_as::<_, RegisterState>(
            "SELECT id, start_cash_cents, opened_at FROM register_state WHERE id = ?1",
        )
        .bind(REGISTER_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Reads the register state inside a day-close transaction.
pub(crate) async fn get_tx(conn: &mut SqliteConnection) -> StoreResult<Option<RegisterState>> {
    let state = sqlx::query_as::<_, RegisterState>(
        "SELECT id, start_cash_cents, opened_at FROM register_state WHERE id = ?1",
    )
    .bind(REGISTER_ID)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(state)
}

/// Rolls the register forward: new opening balance, new day start.
pub(crate) async fn roll_forward(
    conn: &mut SqliteConnection,
    start_cash_cents: i64,
    opened_at: DateTime<Utc>,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO register_state (id, start_cash_cents, opened_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (id) DO UPDATE SET start_cash_cents = ?2, opened_at = ?3
        "#,
    )
    .bind(REGISTER_ID)
    .bind(start_cash_cents)
    .bind(opened_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
