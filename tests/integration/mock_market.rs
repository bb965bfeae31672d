//! Mock market data source for integration testing.
//!
//! Provides a deterministic `MarketData` implementation backed by
//! in-memory tables: no network, fully controllable from test code.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use flipscan::market::MarketData;
use flipscan::types::{HistoryPoint, PriceQuote};

/// A mock market data source with canned quotes and history.
///
/// All state is in-memory. History is keyed by item id; every window
/// request returns the same raw points (the aggregator does its own
/// window filtering), so a test controls which ladder rung qualifies
/// purely through point timestamps.
#[derive(Default)]
pub struct MockMarket {
    prices: HashMap<String, PriceQuote>,
    history: HashMap<String, Vec<HistoryPoint>>,
    /// If set, `current_prices` returns this error once.
    price_error: Mutex<Option<String>>,
    history_calls: AtomicU64,
}

impl MockMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, item_id: &str, price: i64) -> Self {
        self.prices.insert(
            item_id.to_string(),
            PriceQuote {
                price,
                observed_at: None,
            },
        );
        self
    }

    pub fn with_history(mut self, item_id: &str, points: Vec<HistoryPoint>) -> Self {
        self.history.insert(item_id.to_string(), points);
        self
    }

    /// Make the next bulk price call fail at the transport level.
    pub fn fail_prices(self, msg: &str) -> Self {
        *self.price_error.lock().unwrap() = Some(msg.to_string());
        self
    }

    pub fn history_calls(&self) -> u64 {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketData for MockMarket {
    async fn current_prices(
        &self,
        item_ids: &[String],
        _location: &str,
    ) -> Result<HashMap<String, PriceQuote>> {
        if let Some(msg) = self.price_error.lock().unwrap().take() {
            return Err(anyhow!(msg));
        }

        Ok(item_ids
            .iter()
            .filter_map(|id| self.prices.get(id).map(|q| (id.clone(), *q)))
            .collect())
    }

    async fn history(
        &self,
        item_id: &str,
        _location: &str,
        _window_days: u32,
    ) -> Result<Vec<HistoryPoint>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.history.get(item_id).cloned().unwrap_or_default())
    }
}
