//! # Report Rows
//!
//! Builds the tabular rows for the day-close and month-consolidation
//! exports. The rows are plain strings handed to the export collaborator;
//! file formats, encodings, and download mechanics live outside the
//! engine.

use crate::ledger::{MonthSummary, ProductSummary, RegisterTotals};
use crate::money::Money;
use crate::types::Sale;

/// Rows for the day-close report: per-product breakdown followed by the
/// totals block.
pub fn day_close_rows(
    opening: Money,
    totals: &RegisterTotals,
    products: &[ProductSummary],
) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();

    rows.push(vec![
        "Product".to_string(),
        "Units sold".to_string(),
        "Revenue".to_string(),
    ]);
    for p in products {
        rows.push(vec![
            p.name.clone(),
            p.units.to_string(),
            p.revenue.to_string(),
        ]);
    }

    rows.push(Vec::new());
    rows.push(vec!["Totals".to_string(), String::new(), String::new()]);
    rows.push(total_row("Sales", totals.total_sales));
    rows.push(total_row("Drawer sales", totals.drawer_sales));
    rows.push(total_row("Transfer sales", totals.transfer_sales));
    rows.push(total_row("Manual inflows", totals.manual_inflows));
    rows.push(total_row("Outflows", totals.manual_outflows));
    rows.push(total_row("Opening balance", opening));
    rows.push(total_row("Closing balance", totals.drawer_balance));

    rows
}

/// Rows for the month-consolidation export.
pub fn month_summary_rows(summary: &MonthSummary) -> Vec<Vec<String>> {
    vec![
        vec!["Monthly summary".to_string(), summary.month.clone()],
        Vec::new(),
        pair_row("Drawer sales", summary.drawer_sales),
        pair_row("Transfer sales", summary.transfer_sales),
        pair_row("Manual inflows", summary.manual_inflows),
        pair_row("Outflows/Purchases", summary.manual_outflows),
        Vec::new(),
        pair_row("Total drawer inflows", summary.drawer_inflows_total),
        pair_row("Total drawer outflows", summary.drawer_outflows_total),
        pair_row("Drawer balance (in - out)", summary.net_drawer_balance),
    ]
}

/// Rows for a plain sales log export (one row per ticket).
pub fn sales_log_rows(sales: &[Sale]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Date".to_string(),
        "Method".to_string(),
        "Total".to_string(),
        "Paid".to_string(),
        "Change".to_string(),
    ]];

    for s in sales {
        rows.push(vec![
            s.ts.to_rfc3339(),
            format!("{:?}", s.method).to_lowercase(),
            s.total().to_string(),
            s.paid().to_string(),
            s.change().to_string(),
        ]);
    }

    rows
}

fn total_row(label: &str, amount: Money) -> Vec<String> {
    vec![label.to_string(), String::new(), amount.to_string()]
}

fn pair_row(label: &str, amount: Money) -> Vec<String> {
    vec![label.to_string(), amount.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger;
    use crate::types::{CashMovement, MovementKind, PaymentMethod};
    use chrono::Utc;

    #[test]
    fn test_day_close_rows_shape() {
        let sales = vec![Sale {
            id: "s1".to_string(),
            ts: Utc::now(),
            method: PaymentMethod::Drawer,
            total_cents: 15000,
            paid_cents: 15000,
            change_cents: 0,
            note: None,
        }];
        let movements = vec![CashMovement {
            id: "m1".to_string(),
            kind: MovementKind::Outflow,
            concept: "Supplies".to_string(),
            amount_cents: 5000,
            ts: Utc::now(),
        }];
        let totals = ledger::register_totals(&sales, &movements, Money::from_cents(50000));

        let rows = day_close_rows(Money::from_cents(50000), &totals, &[]);

        // Header, blank, "Totals", then 7 totals rows
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0][0], "Product");
        let closing = rows.last().unwrap();
        assert_eq!(closing[0], "Closing balance");
        assert_eq!(closing[2], "$600.00");
    }

    #[test]
    fn test_month_summary_rows_shape() {
        let summary = ledger::month_summary("2026-07", &[], &[]);
        let rows = month_summary_rows(&summary);

        assert_eq!(rows[0], vec!["Monthly summary", "2026-07"]);
        assert_eq!(rows.last().unwrap()[0], "Drawer balance (in - out)");
    }

    #[test]
    fn test_sales_log_rows() {
        let sales = vec![Sale {
            id: "s1".to_string(),
            ts: Utc::now(),
            method: PaymentMethod::Transfer,
            total_cents: 8000,
            paid_cents: 8000,
            change_cents: 0,
            note: None,
        }];

        let rows = sales_log_rows(&sales);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "transfer");
        assert_eq!(rows[1][2], "$80.00");
    }
}
