//! Market data sources.
//!
//! Defines the `MarketData` trait and provides the Albion Online Data
//! Project client. The trait is the seam the engine is tested through:
//! everything above it sees only typed quotes and history points.

pub mod albion;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::types::{HistoryPoint, PriceQuote};

/// Abstraction over the remote price/history source.
///
/// Implementations own transport-level recovery: a failed or malformed
/// call surfaces as an empty result, never as a panic. Callers still
/// guard against `Err` so that mock sources can exercise the degraded
/// paths.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Current best quote per item id at one location.
    ///
    /// One batched request for all ids. Ids with no valid listing are
    /// simply absent from the returned map.
    async fn current_prices(
        &self,
        item_ids: &[String],
        location: &str,
    ) -> Result<HashMap<String, PriceQuote>>;

    /// Raw daily history for one item at one location, covering at
    /// least the past `window_days` days.
    async fn history(
        &self,
        item_id: &str,
        location: &str,
        window_days: u32,
    ) -> Result<Vec<HistoryPoint>>;
}
