//! Albion Online Data Project client.
//!
//! Wraps the public price/history JSON API. No auth; rate limits are
//! per IP, so the client is built once and its connection pool shared
//! across all concurrent lookups.
//!
//! API docs: https://www.albion-online-data.com/
//! Quote tables mix snapshots across qualities and observation times,
//! so quote selection is a cascade: cheapest *fresh* row first, then
//! most recent row regardless of price, then global minimum when no
//! dates are present at all.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::MarketData;
use crate::types::{HistoryPoint, PriceQuote};

/// Qualities outside this range are data glitches and dropped on decode.
const QUALITY_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

// ---------------------------------------------------------------------------
// API response types (Albion Data JSON → Rust)
// ---------------------------------------------------------------------------

/// One row of `/api/v2/stats/prices/{ids}.json`. The API serializes
/// prices inconsistently (number or string depending on gateway), so the
/// price field is decoded tolerantly; a row that still fails to yield a
/// positive price is ignored.
#[derive(Debug, Deserialize)]
struct PriceRow {
    item_id: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    quality: u8,
    #[serde(default, deserialize_with = "de_flexible_price")]
    sell_price_min: i64,
    #[serde(default)]
    sell_price_min_date: Option<String>,
}

/// One per-location series of `/api/v2/stats/history/{id}.json`.
#[derive(Debug, Deserialize)]
struct HistorySeries {
    #[serde(default)]
    location: String,
    #[serde(default)]
    data: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    #[serde(default)]
    item_count: u64,
    #[serde(default)]
    avg_price: f64,
    timestamp: String,
}

/// Accept a price encoded as integer, float, or numeric string.
/// Anything unparsable decodes to 0 and is excluded by row admission.
fn de_flexible_price<'de, D>(de: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Raw::deserialize(de)? {
        Raw::Int(v) => v,
        Raw::Float(v) => v as i64,
        Raw::Text(s) => s.trim().parse::<i64>().unwrap_or(0),
    })
}

/// Parse the API's zoneless ISO 8601 timestamps as UTC.
///
/// The API reports `0001-01-01T00:00:00` for never-observed orders;
/// that sentinel counts as "no date".
fn parse_api_date(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S")
        .ok()?;
    let dt = naive.and_utc();
    if dt.year() <= 1 {
        return None;
    }
    Some(dt)
}

// ---------------------------------------------------------------------------
// Quote selection
// ---------------------------------------------------------------------------

/// Pick one quote from all admitted rows for a single item id.
///
/// 1. Any row observed within the freshness window → minimum price among
///    fresh rows (a cheap stale quote is unrealistic to act on).
/// 2. No fresh rows but some dated → the most recently dated row.
/// 3. No dates at all → global minimum price.
fn select_quote(
    candidates: &[PriceQuote],
    freshness: Duration,
    now: DateTime<Utc>,
) -> Option<PriceQuote> {
    let cutoff = now - freshness;

    let fresh_min = candidates
        .iter()
        .filter(|q| q.observed_at.is_some_and(|d| d >= cutoff))
        .min_by_key(|q| q.price);
    if let Some(q) = fresh_min {
        return Some(*q);
    }

    let most_recent = candidates
        .iter()
        .filter(|q| q.observed_at.is_some())
        .max_by_key(|q| q.observed_at);
    if let Some(q) = most_recent {
        return Some(*q);
    }

    candidates.iter().min_by_key(|q| q.price).copied()
}

/// Row admission: keep rows for the requested city (case-insensitive),
/// with a plausible quality and a positive price. Groups survivors by
/// item id, preserving response order.
fn admit_rows(rows: Vec<PriceRow>, location: &str) -> HashMap<String, Vec<PriceQuote>> {
    let mut by_item: HashMap<String, Vec<PriceQuote>> = HashMap::new();

    for row in rows {
        if !row.city.eq_ignore_ascii_case(location) {
            continue;
        }
        if !QUALITY_RANGE.contains(&row.quality) {
            continue;
        }
        if row.sell_price_min <= 0 {
            continue;
        }
        by_item.entry(row.item_id).or_default().push(PriceQuote {
            price: row.sell_price_min,
            observed_at: row.sell_price_min_date.as_deref().and_then(parse_api_date),
        });
    }

    by_item
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the Albion Online Data Project API.
pub struct AlbionDataClient {
    http: Client,
    base_url: String,
    freshness: Duration,
}

impl AlbionDataClient {
    pub fn new(base_url: &str, timeout_secs: u64, freshness_days: i64) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent("flipscan/0.1.0 (market-flip-scanner)")
            .build()
            .context("Failed to build HTTP client for Albion Data")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            freshness: Duration::days(freshness_days),
        })
    }

    fn prices_url(&self, item_ids: &[String], location: &str) -> String {
        format!(
            "{}/api/v2/stats/prices/{}.json?locations={}&qualities=1,2,3,4,5",
            self.base_url,
            item_ids.join(","),
            urlencoding::encode(location),
        )
    }

    fn history_url(&self, item_id: &str, location: &str, window_days: u32, now: DateTime<Utc>) -> String {
        let from = now - Duration::days(i64::from(window_days));
        format!(
            "{}/api/v2/stats/history/{}.json?locations={}&date={}&end_date={}&time-scale=24",
            self.base_url,
            item_id,
            urlencoding::encode(location),
            from.format("%Y-%m-%d"),
            now.format("%Y-%m-%d"),
        )
    }

    /// GET a URL and decode JSON. Any transport/HTTP/decode failure
    /// degrades to `None`, logged once; the caller treats it as "no
    /// data" for this call, never as a reason to abort the run.
    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Option<T> {
        debug!(url, "Fetching Albion Data");

        let resp = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(url, error = %e, "Albion Data request failed");
                return None;
            }
        };

        if !resp.status().is_success() {
            warn!(url, status = %resp.status(), "Albion Data returned non-success");
            return None;
        }

        match resp.json::<T>().await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(url, error = %e, "Failed to decode Albion Data response");
                None
            }
        }
    }
}

#[async_trait]
impl MarketData for AlbionDataClient {
    async fn current_prices(
        &self,
        item_ids: &[String],
        location: &str,
    ) -> Result<HashMap<String, PriceQuote>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = self.prices_url(item_ids, location);
        let rows: Vec<PriceRow> = match self.fetch_json(&url).await {
            Some(rows) => rows,
            None => return Ok(HashMap::new()),
        };

        let now = Utc::now();
        let admitted = admit_rows(rows, location);

        let mut quotes = HashMap::new();
        for (item_id, candidates) in admitted {
            if let Some(quote) = select_quote(&candidates, self.freshness, now) {
                quotes.insert(item_id, quote);
            }
        }

        debug!(
            requested = item_ids.len(),
            quoted = quotes.len(),
            location,
            "Bulk price lookup complete"
        );
        Ok(quotes)
    }

    async fn history(
        &self,
        item_id: &str,
        location: &str,
        window_days: u32,
    ) -> Result<Vec<HistoryPoint>> {
        let url = self.history_url(item_id, location, window_days, Utc::now());
        let series: Vec<HistorySeries> = match self.fetch_json(&url).await {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };

        let points: Vec<HistoryPoint> = series
            .into_iter()
            .filter(|s| s.location.eq_ignore_ascii_case(location))
            .flat_map(|s| s.data)
            .filter_map(|e| {
                let timestamp = parse_api_date(&e.timestamp)?;
                Some(HistoryPoint {
                    timestamp,
                    avg_price: e.avg_price,
                    item_count: e.item_count,
                })
            })
            .collect();

        Ok(points)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
