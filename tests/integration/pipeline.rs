//! End-to-end pipeline tests: variants → prices → history ladder →
//! profit filters → ranked report.

use chrono::{Duration, Utc};

use flipscan::config::AppConfig;
use flipscan::engine;
use flipscan::report;
use flipscan::types::{HistoryPoint, ScanProgress, SkipReason};

use tokio_test::assert_ok;

use crate::mock_market::MockMarket;

fn point(days_ago: i64, avg_price: f64, item_count: u64) -> HistoryPoint {
    HistoryPoint {
        timestamp: Utc::now() - Duration::days(days_ago),
        avg_price,
        item_count,
    }
}

/// One base code, one tier, no enchantments: a single T4_BAG variant.
fn single_variant_cfg() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.variants.min_tier = 4;
    cfg.variants.max_tier = 4;
    cfg.variants.max_enchant = 0;
    cfg.scan.concurrency = 2;
    cfg
}

fn base_codes() -> Vec<String> {
    vec!["BAG".to_string()]
}

#[tokio::test]
async fn test_profitable_variant_admitted() {
    // Buy at 20k, resale history averages 24k at 1.5 units/day → +20%,
    // above the default 10% threshold.
    let source = MockMarket::new().with_quote("T4_BAG", 20_000).with_history(
        "T4_BAG",
        vec![point(1, 24_000.0, 1), point(2, 24_000.0, 2)],
    );
    let cfg = single_variant_cfg();
    let progress = ScanProgress::new();

    let scan = engine::run_scan(&source, &cfg, &base_codes(), &progress)
        .await
        .unwrap();

    assert_eq!(scan.variants_scanned, 1);
    assert_eq!(scan.rows.len(), 1);
    assert!(scan.skipped.is_empty());

    let row = &scan.rows[0];
    assert_eq!(row.item_id, "T4_BAG");
    assert_eq!(row.buy_price, 20_000);
    assert!((row.profit_percent - 20.0).abs() < 1e-9);
    assert!((row.avg_sold_per_day - 1.5).abs() < 1e-9);

    let text = report::render(&scan);
    assert!(text.contains("T4_BAG"));
    assert!(text.contains("+20.0%"));
}

#[tokio::test]
async fn test_raised_threshold_skips_same_variant() {
    let source = MockMarket::new().with_quote("T4_BAG", 20_000).with_history(
        "T4_BAG",
        vec![point(1, 24_000.0, 1), point(2, 24_000.0, 2)],
    );
    let mut cfg = single_variant_cfg();
    cfg.filters.min_profit_percent = 25.0;
    let progress = ScanProgress::new();

    let scan = engine::run_scan(&source, &cfg, &base_codes(), &progress)
        .await
        .unwrap();

    assert!(scan.rows.is_empty());
    assert_eq!(scan.skipped.len(), 1);
    assert!(matches!(
        scan.skipped[0].reason,
        SkipReason::MarginBelowThreshold { .. }
    ));

    let text = report::render(&scan);
    assert!(text.contains("— no profitable variants found —"));
    assert!(text.contains("margin below threshold"));
}

#[tokio::test(start_paused = true)]
async fn test_price_transport_failure_degrades_to_skips() {
    // The bulk price call fails outright; the run must still complete,
    // with every variant reported as unquoted rather than aborting.
    let source = MockMarket::new()
        .with_history("T4_BAG", vec![point(1, 24_000.0, 3)])
        .fail_prices("connection refused");
    let cfg = single_variant_cfg();
    let progress = ScanProgress::new();

    let result = engine::run_scan(&source, &cfg, &base_codes(), &progress).await;
    let scan = assert_ok!(result);

    assert!(scan.rows.is_empty());
    assert_eq!(scan.skipped.len(), 1);
    assert_eq!(scan.skipped[0].reason, SkipReason::NoBuyQuote);
}

#[tokio::test(start_paused = true)]
async fn test_ladder_escalates_through_pipeline() {
    // History only exists between 14 and 30 days ago: the 14-day rung
    // comes up empty, the 30-day rung qualifies.
    let source = MockMarket::new().with_quote("T4_BAG", 1_000).with_history(
        "T4_BAG",
        vec![point(20, 2_000.0, 4), point(25, 2_000.0, 2)],
    );
    let cfg = single_variant_cfg();
    let progress = ScanProgress::new();

    let scan = engine::run_scan(&source, &cfg, &base_codes(), &progress)
        .await
        .unwrap();

    assert_eq!(source.history_calls(), 2, "14-day then 30-day attempt");
    assert_eq!(scan.rows.len(), 1);
    assert!((scan.rows[0].avg_price - 2_000.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_no_history_yields_zero_aggregate_skip() {
    let source = MockMarket::new().with_quote("T4_BAG", 1_000);
    let cfg = single_variant_cfg();
    let progress = ScanProgress::new();

    let scan = engine::run_scan(&source, &cfg, &base_codes(), &progress)
        .await
        .unwrap();

    // All three ladder rungs tried, none qualified.
    assert_eq!(source.history_calls(), 3);
    assert_eq!(scan.skipped[0].reason, SkipReason::NoHistorySignal);
}

#[tokio::test]
async fn test_ranking_is_deterministic_across_runs() {
    let build = || {
        MockMarket::new()
            .with_quote("T4_BAG", 1_000)
            .with_quote("T5_BAG", 2_000)
            .with_quote("T6_BAG", 1_000)
            .with_history("T4_BAG", vec![point(1, 1_500.0, 5)])
            .with_history("T5_BAG", vec![point(1, 3_000.0, 2)])
            // Same +50% margin as T4 but more liquid, so it must rank above it.
            .with_history("T6_BAG", vec![point(1, 1_500.0, 9)])
    };
    let mut cfg = single_variant_cfg();
    cfg.variants.max_tier = 6;

    let progress = ScanProgress::new();
    let first = engine::run_scan(&build(), &cfg, &base_codes(), &progress)
        .await
        .unwrap();
    let second = engine::run_scan(&build(), &cfg, &base_codes(), &progress)
        .await
        .unwrap();

    assert_eq!(first.rows, second.rows);
    assert_eq!(first.skipped, second.skipped);
    assert_eq!(report::render(&first), report::render(&second));

    let order: Vec<&str> = first.rows.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(order, vec!["T6_BAG", "T4_BAG", "T5_BAG"]);
}

#[tokio::test(start_paused = true)]
async fn test_progress_reaches_total() {
    let source = MockMarket::new().with_quote("T4_BAG", 1_000).with_history(
        "T4_BAG",
        vec![point(1, 2_000.0, 3)],
    );
    let mut cfg = single_variant_cfg();
    cfg.variants.max_enchant = 3; // 4 variants

    let progress = ScanProgress::new();
    engine::run_scan(&source, &cfg, &base_codes(), &progress)
        .await
        .unwrap();

    let snap = progress.snapshot();
    assert_eq!(snap.total, 4);
    assert_eq!(snap.done, 4);
    assert!(!snap.running);
}

#[tokio::test]
async fn test_malformed_range_is_fatal() {
    let source = MockMarket::new();
    let mut cfg = single_variant_cfg();
    cfg.variants.min_tier = 8;
    cfg.variants.max_tier = 4;
    let progress = ScanProgress::new();

    let result = engine::run_scan(&source, &cfg, &base_codes(), &progress).await;
    assert!(result.is_err());
}
