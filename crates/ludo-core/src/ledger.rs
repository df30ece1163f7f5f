//! # Cash Ledger
//!
//! The single authority for the drawer balance.
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Drawer Balance Derivation                         │
//! │                                                                         │
//! │  opening balance (RegisterState.start_cash)                            │
//! │       + drawer sales        (Sale.method == Drawer)                    │
//! │       + manual inflows      (CashMovement.kind == Inflow)              │
//! │       − manual outflows     (kind == Outflow or Purchase)              │
//! │  ───────────────────────────────────────────────────────────           │
//! │       = drawer balance                                                 │
//! │                                                                         │
//! │  Transfer sales are tracked but NEVER touch the drawer.                │
//! │                                                                         │
//! │  Pure function of (sales, movements, opening): re-derivable at any     │
//! │  time from history. No caching, no hidden state - reconciliation       │
//! │  after a change notification is a plain recompute, not a merge.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every other component (day close, month consolidation, the header
//! readout) calls into this module; none computes the balance on its own.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CashMovement, PaymentMethod, Sale, SaleWithLines};

// =============================================================================
// Register Totals
// =============================================================================

/// Aggregated cash position over a slice of history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegisterTotals {
    /// Sum of all sale totals, regardless of method.
    pub total_sales: Money,

    /// Sum of sale totals settled into the drawer.
    pub drawer_sales: Money,

    /// Sum of sale totals settled by transfer.
    pub transfer_sales: Money,

    /// Manual cash added to the drawer.
    pub manual_inflows: Money,

    /// Manual cash taken from the drawer (outflows and purchases).
    pub manual_outflows: Money,

    /// The authoritative drawer balance:
    /// `opening + drawer_sales + manual_inflows - manual_outflows`.
    pub drawer_balance: Money,
}

/// Computes the register totals from raw history.
///
/// Purchase-kind movements are counted with outflows unconditionally -
/// a purchase settled by transfer would still reduce the computed drawer
/// balance. This mirrors how the venue actually records restocks.
pub fn register_totals(
    sales: &[Sale],
    movements: &[CashMovement],
    opening: Money,
) -> RegisterTotals {
    let total_sales: Money = sales.iter().map(Sale::total).sum();
    let drawer_sales: Money = sales
        .iter()
        .filter(|s| s.method == PaymentMethod::Drawer)
        .map(Sale::total)
        .sum();
    let transfer_sales: Money = sales
        .iter()
        .filter(|s| s.method == PaymentMethod::Transfer)
        .map(Sale::total)
        .sum();

    let manual_inflows: Money = movements
        .iter()
        .filter(|m| !m.kind.is_outflow())
        .map(CashMovement::amount)
        .sum();
    let manual_outflows: Money = movements
        .iter()
        .filter(|m| m.kind.is_outflow())
        .map(CashMovement::amount)
        .sum();

    RegisterTotals {
        total_sales,
        drawer_sales,
        transfer_sales,
        manual_inflows,
        manual_outflows,
        drawer_balance: opening + drawer_sales + manual_inflows - manual_outflows,
    }
}

// =============================================================================
// Month Summary
// =============================================================================

/// Monthly summary for export, computed before the month's records are
/// purged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthSummary {
    /// Month label, `YYYY-MM`.
    pub month: String,

    pub drawer_sales: Money,
    pub transfer_sales: Money,
    pub manual_inflows: Money,
    pub manual_outflows: Money,

    /// Everything that entered the drawer: drawer sales + manual inflows.
    pub drawer_inflows_total: Money,

    /// Everything that left the drawer.
    pub drawer_outflows_total: Money,

    /// Net drawer movement for the month (inflows − outflows).
    pub net_drawer_balance: Money,
}

/// Computes the summary for one month's records.
///
/// The caller is responsible for passing only records within the month
/// window; the store layer selects them with the same predicate it later
/// purges with.
pub fn month_summary(month: &str, sales: &[Sale], movements: &[CashMovement]) -> MonthSummary {
    let totals = register_totals(sales, movements, Money::zero());

    let drawer_inflows_total = totals.drawer_sales + totals.manual_inflows;
    let drawer_outflows_total = totals.manual_outflows;

    MonthSummary {
        month: month.to_string(),
        drawer_sales: totals.drawer_sales,
        transfer_sales: totals.transfer_sales,
        manual_inflows: totals.manual_inflows,
        manual_outflows: totals.manual_outflows,
        drawer_inflows_total,
        drawer_outflows_total,
        net_drawer_balance: drawer_inflows_total - drawer_outflows_total,
    }
}

// =============================================================================
// Per-Product Summary
// =============================================================================

/// Units and revenue for one product (or service concept) across a set
/// of sales. Shown in the day-close report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSummary {
    pub name: String,
    pub units: i64,
    pub revenue: Money,
}

/// Aggregates sold units and revenue per product, sorted by revenue
/// descending.
///
/// Inventory lines group by product id; service lines (no product id)
/// group by name, so distinct service concepts report separately.
pub fn product_summary(sales: &[SaleWithLines]) -> Vec<ProductSummary> {
    let mut map: HashMap<String, ProductSummary> = HashMap::new();

    for sale in sales {
        for line in &sale.lines {
            let key = line
                .product_id
                .clone()
                .unwrap_or_else(|| format!("name:{}", line.name));
            let entry = map.entry(key).or_insert_with(|| ProductSummary {
                name: line.name.clone(),
                units: 0,
                revenue: Money::zero(),
            });
            entry.units += line.quantity;
            entry.revenue += line.subtotal();
        }
    }

    let mut rows: Vec<ProductSummary> = map.into_values().collect();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    rows
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MovementKind, SaleLine};
    use chrono::Utc;

    fn sale(id: &str, method: PaymentMethod, total_cents: i64) -> Sale {
        Sale {
            id: id.to_string(),
            ts: Utc::now(),
            method,
            total_cents,
            paid_cents: total_cents,
            change_cents: 0,
            note: None,
        }
    }

    fn movement(kind: MovementKind, amount_cents: i64) -> CashMovement {
        CashMovement {
            id: "m".to_string(),
            kind,
            concept: "test".to_string(),
            amount_cents,
            ts: Utc::now(),
        }
    }

    /// Opening 500.00, one drawer sale of 150.00, one transfer sale of
    /// 80.00, one purchase outflow of 50.00:
    /// drawer balance = 500 + 150 − 50 = 600.00, transfers = 80.00.
    #[test]
    fn test_register_totals_scenario() {
        let sales = vec![
            sale("s1", PaymentMethod::Drawer, 15000),
            sale("s2", PaymentMethod::Transfer, 8000),
        ];
        let movements = vec![movement(MovementKind::Purchase, 5000)];

        let totals = register_totals(&sales, &movements, Money::from_cents(50000));

        assert_eq!(totals.drawer_balance.cents(), 60000);
        assert_eq!(totals.transfer_sales.cents(), 8000);
        assert_eq!(totals.drawer_sales.cents(), 15000);
        assert_eq!(totals.total_sales.cents(), 23000);
        assert_eq!(totals.manual_outflows.cents(), 5000);
        assert_eq!(totals.manual_inflows.cents(), 0);
    }

    #[test]
    fn test_transfer_sales_never_touch_drawer() {
        let sales = vec![sale("s1", PaymentMethod::Transfer, 99900)];

        let totals = register_totals(&sales, &[], Money::from_cents(1000));

        assert_eq!(totals.drawer_balance.cents(), 1000);
        assert_eq!(totals.transfer_sales.cents(), 99900);
    }

    #[test]
    fn test_outflow_and_purchase_both_reduce_drawer() {
        let movements = vec![
            movement(MovementKind::Inflow, 2000),
            movement(MovementKind::Outflow, 500),
            movement(MovementKind::Purchase, 700),
        ];

        let totals = register_totals(&[], &movements, Money::zero());

        assert_eq!(totals.manual_inflows.cents(), 2000);
        assert_eq!(totals.manual_outflows.cents(), 1200);
        assert_eq!(totals.drawer_balance.cents(), 800);
    }

    #[test]
    fn test_empty_history_is_opening_balance() {
        let totals = register_totals(&[], &[], Money::from_cents(12345));
        assert_eq!(totals.drawer_balance.cents(), 12345);
        assert!(totals.total_sales.is_zero());
    }

    #[test]
    fn test_month_summary() {
        let sales = vec![
            sale("s1", PaymentMethod::Drawer, 10000),
            sale("s2", PaymentMethod::Transfer, 4000),
        ];
        let movements = vec![
            movement(MovementKind::Inflow, 1000),
            movement(MovementKind::Purchase, 2500),
        ];

        let summary = month_summary("2026-07", &sales, &movements);

        assert_eq!(summary.month, "2026-07");
        assert_eq!(summary.drawer_sales.cents(), 10000);
        assert_eq!(summary.transfer_sales.cents(), 4000);
        assert_eq!(summary.drawer_inflows_total.cents(), 11000);
        assert_eq!(summary.drawer_outflows_total.cents(), 2500);
        assert_eq!(summary.net_drawer_balance.cents(), 8500);
    }

    fn with_lines(sale: Sale, lines: Vec<(Option<&str>, &str, i64, i64)>) -> SaleWithLines {
        let lines = lines
            .into_iter()
            .enumerate()
            .map(|(i, (pid, name, qty, unit))| SaleLine {
                id: format!("l{i}"),
                sale_id: sale.id.clone(),
                product_id: pid.map(str::to_string),
                name: name.to_string(),
                unit_price_cents: unit,
                quantity: qty,
                subtotal_cents: unit * qty,
            })
            .collect();
        SaleWithLines { sale, lines }
    }

    #[test]
    fn test_product_summary_merges_and_sorts() {
        let sales = vec![
            with_lines(
                sale("s1", PaymentMethod::Drawer, 0),
                vec![(Some("p1"), "Agua 600 ml", 2, 1200), (None, "Visita 1-2 HRS", 1, 8000)],
            ),
            with_lines(
                sale("s2", PaymentMethod::Drawer, 0),
                vec![(Some("p1"), "Agua 600 ml", 3, 1200), (None, "Paquete 1", 1, 45000)],
            ),
        ];

        let rows = product_summary(&sales);

        assert_eq!(rows.len(), 3);
        // Sorted by revenue descending
        assert_eq!(rows[0].name, "Paquete 1");
        assert_eq!(rows[0].revenue.cents(), 45000);

        let agua = rows.iter().find(|r| r.name == "Agua 600 ml").unwrap();
        assert_eq!(agua.units, 5);
        assert_eq!(agua.revenue.cents(), 6000);

        // Service concepts stay separate even without product ids
        assert!(rows.iter().any(|r| r.name == "Visita 1-2 HRS"));
    }
}
