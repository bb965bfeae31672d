//! Profit computation, admission filtering, and ranking.
//!
//! Pure functions over the collected price map and aggregates: no I/O,
//! no mutation of inputs, deterministic given identical inputs. Every
//! rejected variant carries a named skip reason so an operator can tell
//! why a candidate did not appear.

use std::collections::HashMap;

use crate::config::FilterConfig;
use crate::types::{Aggregate, PriceQuote, ProfitRow, SkipReason, SkippedVariant, Variant};

/// Evaluate every variant against the admission filters, in variant
/// order. Filters apply in a fixed order; the first failure names the
/// skip reason.
pub fn evaluate(
    variants: &[Variant],
    prices: &HashMap<String, PriceQuote>,
    aggregates: &HashMap<String, Aggregate>,
    filters: &FilterConfig,
) -> (Vec<ProfitRow>, Vec<SkippedVariant>) {
    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for variant in variants {
        match evaluate_one(variant, prices, aggregates, filters) {
            Ok(row) => rows.push(row),
            Err(reason) => skipped.push(SkippedVariant {
                item_id: variant.item_id.clone(),
                reason,
            }),
        }
    }

    (rows, skipped)
}

fn evaluate_one(
    variant: &Variant,
    prices: &HashMap<String, PriceQuote>,
    aggregates: &HashMap<String, Aggregate>,
    filters: &FilterConfig,
) -> Result<ProfitRow, SkipReason> {
    let quote = prices.get(&variant.item_id).copied();
    let buy_price = quote.map(|q| q.price).unwrap_or(0);
    if buy_price <= 0 {
        return Err(SkipReason::NoBuyQuote);
    }

    let agg = aggregates
        .get(&variant.item_id)
        .copied()
        .unwrap_or_else(Aggregate::zero);
    if agg.avg_price <= 0.0 {
        return Err(SkipReason::NoHistorySignal);
    }

    if agg.avg_sold_per_day < filters.min_sold_per_day {
        return Err(SkipReason::InsufficientLiquidity {
            sold_per_day: agg.avg_sold_per_day,
        });
    }

    let profit_percent = profit_percent(buy_price, agg.avg_price);
    if profit_percent < filters.min_profit_percent {
        return Err(SkipReason::MarginBelowThreshold { profit_percent });
    }

    Ok(ProfitRow {
        item_id: variant.item_id.clone(),
        tier: variant.tier,
        enchantment: variant.enchantment,
        buy_price,
        buy_date: quote.and_then(|q| q.observed_at),
        avg_price: agg.avg_price,
        avg_sold_per_day: agg.avg_sold_per_day,
        profit_percent,
    })
}

/// Margin of reselling at the historical average after buying now.
/// Only meaningful for `buy_price > 0`; callers filter first.
fn profit_percent(buy_price: i64, avg_price: f64) -> f64 {
    ((avg_price - buy_price as f64) / buy_price as f64) * 100.0
}

/// Sort descending by margin, ties broken descending by daily volume.
/// A high-margin item nobody sells is a worse find than a lower-margin
/// item that sells constantly.
pub fn rank(rows: &mut [ProfitRow]) {
    rows.sort_by(|a, b| {
        b.profit_percent
            .partial_cmp(&a.profit_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.avg_sold_per_day
                    .partial_cmp(&a.avg_sold_per_day)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
