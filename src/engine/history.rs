//! History aggregation with an adaptive fallback ladder.
//!
//! For one item the ladder tries each configured window in ascending
//! order: fetch, filter to the window, reduce. A window qualifies when
//! it holds enough points and both reductions come out positive. Between
//! attempts the task sleeps a courtesy delay, a suspension point local
//! to this item, so concurrent lookups for other items keep running.
//!
//! Exhausting every window is not an error; the zero aggregate reads as
//! "insufficient market activity" and is filtered upstream.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::HistoryConfig;
use crate::market::MarketData;
use crate::types::{Aggregate, HistoryPoint};

/// Run the fallback ladder for one item and return its aggregate.
pub async fn aggregate<M: MarketData + ?Sized>(
    source: &M,
    item_id: &str,
    location: &str,
    cfg: &HistoryConfig,
) -> Aggregate {
    let delay = std::time::Duration::from_secs(cfg.retry_delay_secs);

    for (attempt, &window_days) in cfg.windows.iter().enumerate() {
        // The throttle sits between attempts, never before the first
        // or after the last.
        if attempt > 0 {
            tokio::time::sleep(delay).await;
        }

        let points = match source.history(item_id, location, window_days).await {
            Ok(points) => points,
            Err(e) => {
                warn!(item_id, window_days, error = %e, "History fetch failed, treating as empty");
                Vec::new()
            }
        };

        let now = Utc::now();
        if let Some(agg) = reduce_window(&points, window_days, cfg.min_points, now) {
            debug!(
                item_id,
                window_days,
                points = agg.points_used,
                avg_price = agg.avg_price,
                sold_per_day = agg.avg_sold_per_day,
                "History window qualified"
            );
            return agg;
        }

        debug!(item_id, window_days, "History window insufficient, escalating");
    }

    debug!(item_id, "All history windows exhausted");
    Aggregate::zero()
}

/// Filter points to the window and reduce them. Returns `None` when the
/// window does not qualify (too few points, or a non-positive reduction).
fn reduce_window(
    points: &[HistoryPoint],
    window_days: u32,
    min_points: usize,
    now: DateTime<Utc>,
) -> Option<Aggregate> {
    let cutoff = now - Duration::days(i64::from(window_days));
    let recent: Vec<&HistoryPoint> = points.iter().filter(|p| p.timestamp >= cutoff).collect();

    if recent.len() < min_points {
        return None;
    }

    let avg_price = mean_price(&recent);
    let avg_sold_per_day = sold_per_day(&recent);
    if avg_price <= 0.0 || avg_sold_per_day <= 0.0 {
        return None;
    }

    Some(Aggregate {
        avg_price,
        avg_sold_per_day,
        window_days,
        points_used: recent.len(),
    })
}

/// Mean of `avg_price` over points with a positive price; 0 if none.
fn mean_price(points: &[&HistoryPoint]) -> f64 {
    let priced: Vec<f64> = points
        .iter()
        .filter(|p| p.avg_price > 0.0)
        .map(|p| p.avg_price)
        .collect();
    if priced.is_empty() {
        return 0.0;
    }
    priced.iter().sum::<f64>() / priced.len() as f64
}

/// Average units sold per day with data.
///
/// Groups points by calendar day, sums `item_count` per day, then
/// averages the per-day sums. Dividing total units by the nominal
/// window length would understate volume whenever days are missing
/// from the sample.
fn sold_per_day(points: &[&HistoryPoint]) -> f64 {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for p in points {
        *per_day.entry(p.timestamp.date_naive()).or_default() += p.item_count;
    }
    if per_day.is_empty() {
        return 0.0;
    }
    per_day.values().sum::<u64>() as f64 / per_day.len() as f64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
