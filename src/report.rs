//! Report rendering.
//!
//! Formats a finished scan as a fixed-width table plus a skip summary
//! grouped by reason. Rendering is string-in, string-out so it can be
//! asserted on directly in tests.

use std::collections::BTreeMap;

use crate::types::ScanReport;

/// Render the ranked results as a fixed-width text table.
pub fn render(report: &ScanReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Profitable variants, {} → {} (≥ {:.0}% margin, {} variants scanned):\n",
        report.buy_location,
        report.sell_location,
        report.min_profit_percent,
        report.variants_scanned,
    ));

    if report.rows.is_empty() {
        out.push_str("— no profitable variants found —\n");
    } else {
        out.push_str(&format!(
            "{:<16} | {:>10} | {:>10} | {:>8} | {:>8}\n",
            "ITEM", "BUY", "AVG SELL", "SOLD/DAY", "PROFIT"
        ));
        for row in &report.rows {
            out.push_str(&format!(
                "{:<16} | {:>10} | {:>10.0} | {:>8.1} | {:>+7.1}%\n",
                row.item_id,
                row.buy_price,
                row.avg_price,
                row.avg_sold_per_day,
                row.profit_percent,
            ));
        }
    }

    if !report.skipped.is_empty() {
        out.push('\n');
        out.push_str(&skip_summary(report));
    }

    out
}

/// One line per skip reason with a count, in stable label order.
fn skip_summary(report: &ScanReport) -> String {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for skip in &report.skipped {
        *counts.entry(skip.reason.label()).or_default() += 1;
    }

    let mut out = format!("Skipped {} variants:\n", report.skipped.len());
    for (label, count) in counts {
        out.push_str(&format!("  {count:>4} × {label}\n"));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
