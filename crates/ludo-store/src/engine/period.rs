//! # Period Consolidator
//!
//! Closes a day (rolls the drawer balance forward, purges day-scoped
//! activity) or a month (exports a summary, then purges month-scoped
//! activity).
//!
//! ## Day Close
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  close_day(now)                                                        │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    load sales + movements with ts >= opened_at                         │
//! │    balance = ledger::register_totals(...)  ← the single authority      │
//! │    register_state: start_cash = balance, opened_at = now               │
//! │    DELETE that same window of sales and movements                      │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Destructive. The engine performs no confirmation itself - it trusts   │
//! │  the caller to have obtained explicit consent at the UI boundary.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Month Consolidation
//! Export-then-purge is a correctness requirement: the exporter runs
//! first, inside the transaction scope, and an exporter error aborts the
//! whole operation with nothing deleted.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::notify::EntityTable;
use crate::repository::{cash, register, sale};
use ludo_core::ledger::{self, MonthSummary};
use ludo_core::{report, Money, RegisterState, REGISTER_ID};

use super::RegisterEngine;

impl RegisterEngine {
    /// Closes the current day.
    ///
    /// Computes the drawer balance over `[opened_at, now)` via the cash
    /// ledger, writes it as the new opening balance with `opened_at =
    /// now`, and purges the closed window's sales and movements - all in
    /// one transaction.
    pub async fn close_day(&self, now: DateTime<Utc>) -> StoreResult<RegisterState> {
        let mut tx = self.pool().begin().await?;

        // A register that was never initialized still consolidates any
        // activity it accumulated: the window starts at the epoch.
        let (opening, window_start) = match register::get_tx(&mut tx).await? {
            Some(state) => (state.opening_balance(), state.opened_at),
            None => (
                Money::zero(),
                Utc.timestamp_opt(0, 0)
                    .single()
                    .expect("epoch is a valid timestamp"),
            ),
        };

        let sales = sale::list_since_tx(&mut tx, window_start).await?;
        let moves = cash::list_since_tx(&mut tx, window_start).await?;
        let totals = ledger::register_totals(&sales, &moves, opening);

        register::roll_forward(&mut tx, totals.drawer_balance.cents(), now).await?;
        let purged_sales = sale::delete_since(&mut tx, window_start).await?;
        let purged_moves = cash::delete_since(&mut tx, window_start).await?;

        tx.commit().await?;

        self.publish(EntityTable::Sales);
        self.publish(EntityTable::CashMoves);
        self.publish(EntityTable::RegisterState);

        info!(
            new_opening = %totals.drawer_balance,
            purged_sales = %purged_sales,
            purged_moves = %purged_moves,
            "Day closed"
        );

        Ok(RegisterState {
            id: REGISTER_ID.to_string(),
            start_cash_cents: totals.drawer_balance.cents(),
            opened_at: now,
        })
    }

    /// Builds the day-close report rows for the currently open day
    /// (per-product breakdown plus the totals block). Read-only; hand
    /// the rows to the export collaborator before calling
    /// [`RegisterEngine::close_day`].
    pub async fn day_close_report(&self, now: DateTime<Utc>) -> StoreResult<Vec<Vec<String>>> {
        let state = self.register().get_or_init(now).await?;
        let sales = self
            .sales()
            .list_since_with_lines(state.opened_at)
            .await?;
        let moves = self.cash_moves().list_since(state.opened_at).await?;

        let flat: Vec<_> = sales.iter().map(|s| s.sale.clone()).collect();
        let totals = ledger::register_totals(&flat, &moves, state.opening_balance());
        let products = ledger::product_summary(&sales);

        Ok(report::day_close_rows(
            state.opening_balance(),
            &totals,
            &products,
        ))
    }

    /// Computes the summary for one calendar month, read-only.
    ///
    /// `month_start` may be any instant within the month; it is truncated
    /// to the month's first instant (UTC) and the window is
    /// `[start, next month start)`.
    pub async fn month_summary(&self, month_start: DateTime<Utc>) -> StoreResult<MonthSummary> {
        let (start, end, label) = month_window(month_start);

        let sales = self.sales().list_between(start, end).await?;
        let moves = self.cash_moves().list_between(start, end).await?;

        Ok(ledger::month_summary(&label, &sales, &moves))
    }

    /// Consolidates one calendar month: computes the summary, hands it to
    /// `exporter`, and only if the export succeeds purges the month's
    /// sales and movements.
    ///
    /// An exporter error aborts with [`StoreError::ExportAborted`] and
    /// nothing is deleted.
    pub async fn consolidate_month<F>(
        &self,
        month_start: DateTime<Utc>,
        exporter: F,
    ) -> StoreResult<MonthSummary>
    where
        F: FnOnce(&MonthSummary) -> Result<(), String>,
    {
        let (start, end, label) = month_window(month_start);

        let mut tx = self.pool().begin().await?;

        let sales = sale::list_between_tx(&mut tx, start, end).await?;
        let moves = cash::list_between_tx(&mut tx, start, end).await?;
        let summary = ledger::month_summary(&label, &sales, &moves);

        // Export first. On failure the transaction drops and the month's
        // records survive untouched.
        exporter(&summary).map_err(StoreError::ExportAborted)?;

        let purged_sales = sale::delete_between(&mut tx, start, end).await?;
        let purged_moves = cash::delete_between(&mut tx, start, end).await?;

        tx.commit().await?;

        self.publish(EntityTable::Sales);
        self.publish(EntityTable::CashMoves);

        info!(
            month = %summary.month,
            purged_sales = %purged_sales,
            purged_moves = %purged_moves,
            "Month consolidated"
        );

        Ok(summary)
    }
}

/// Truncates an instant to its calendar month: `[start, end)` plus the
/// `YYYY-MM` label.
fn month_window(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, String) {
    let (year, month) = (at.year(), at.month());
    let start = first_instant(year, month);
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = first_instant(next_year, next_month);

    (start, end, format!("{year:04}-{month:02}"))
}

fn first_instant(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("first day of a month is a valid timestamp")
}

// =============================================================================
// Unit Tests
// =============================================================================
