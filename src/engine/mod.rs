//! The scan pipeline.
//!
//! One invocation flows one way: base codes → variants → (bulk prices,
//! per-variant history) → aggregates → profit rows → ranked report.
//! History lookups for independent variants run concurrently under a
//! bounded fan-out; the ladder within one variant stays sequential.

pub mod history;
pub mod profit;

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use crate::catalog;
use crate::config::AppConfig;
use crate::market::MarketData;
use crate::types::{Aggregate, ScanProgress, ScanReport, Variant};

/// Run one full scan and produce the ranked report.
///
/// Per-variant failures degrade to skips; the only errors that
/// propagate are configuration faults surfaced by variant generation.
pub async fn run_scan<M: MarketData>(
    source: &M,
    cfg: &AppConfig,
    base_codes: &[String],
    progress: &ScanProgress,
) -> Result<ScanReport> {
    let started = Instant::now();

    let variants: Vec<Variant> = catalog::generate_variants(
        base_codes,
        cfg.variants.min_tier,
        cfg.variants.max_tier,
        cfg.variants.max_enchant,
    )?
    .collect();

    progress.reset(variants.len());
    info!(
        variants = variants.len(),
        base_codes = base_codes.len(),
        buy = %cfg.market.buy_location,
        sell = %cfg.market.sell_location,
        "Scan started"
    );

    // 1. Bulk current prices at the buy location, one batched request.
    let item_ids: Vec<String> = variants.iter().map(|v| v.item_id.clone()).collect();
    let prices = source
        .current_prices(&item_ids, &cfg.market.buy_location)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Bulk price lookup failed, treating all ids as unquoted");
            HashMap::new()
        });
    info!(quoted = prices.len(), "Current prices fetched");

    // 2. Per-variant history aggregation, bounded fan-out. Completion
    //    order does not matter; ranking is a pure post-processing step.
    let aggregates: HashMap<String, Aggregate> = stream::iter(variants.iter())
        .map(|v| {
            let item_id = v.item_id.clone();
            async move {
                let agg =
                    history::aggregate(source, &item_id, &cfg.market.sell_location, &cfg.history)
                        .await;
                progress.inc_done();
                (item_id, agg)
            }
        })
        .buffer_unordered(cfg.scan.concurrency)
        .collect()
        .await;
    progress.finish();

    let with_signal = aggregates.values().filter(|a| a.has_signal()).count();
    info!(
        aggregated = aggregates.len(),
        with_signal,
        "History aggregation complete"
    );

    // 3. Evaluate, then rank.
    let (mut rows, skipped) = profit::evaluate(&variants, &prices, &aggregates, &cfg.filters);
    profit::rank(&mut rows);

    for skip in &skipped {
        debug!(item_id = %skip.item_id, reason = %skip.reason, "Variant skipped");
    }

    let report = ScanReport {
        generated_at: Utc::now(),
        buy_location: cfg.market.buy_location.clone(),
        sell_location: cfg.market.sell_location.clone(),
        min_profit_percent: cfg.filters.min_profit_percent,
        variants_scanned: variants.len(),
        rows,
        skipped,
        duration_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        admitted = report.rows.len(),
        skipped = report.skipped.len(),
        duration_ms = report.duration_ms,
        "Scan complete"
    );

    Ok(report)
}
