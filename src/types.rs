//! Shared types for the flip scanner.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that market, engine, and
//! dashboard modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// One tradeable tier/enchantment instance of a base item family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub base_code: String,
    pub tier: u8,
    /// 0 means no enchantment.
    pub enchantment: u8,
    /// Canonical id: `T{tier}_{base_code}`, with `@{enchantment}` appended
    /// when the enchantment is non-zero.
    pub item_id: String,
}

impl Variant {
    pub fn new(base_code: &str, tier: u8, enchantment: u8) -> Self {
        Self {
            base_code: base_code.to_string(),
            tier,
            enchantment,
            item_id: Self::item_id_for(base_code, tier, enchantment),
        }
    }

    /// Derive the canonical item id for a (base_code, tier, enchantment)
    /// triple. The id is never stored independently of the triple.
    pub fn item_id_for(base_code: &str, tier: u8, enchantment: u8) -> String {
        if enchantment == 0 {
            format!("T{tier}_{base_code}")
        } else {
            format!("T{tier}_{base_code}@{enchantment}")
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.item_id)
    }
}

// ---------------------------------------------------------------------------
// Market observations
// ---------------------------------------------------------------------------

/// A current sell-side price observation for one variant at one location.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PriceQuote {
    /// Unit price in silver. Always > 0 for a quote that made it past
    /// row admission; zero/absent upstream means "no listing".
    pub price: i64,
    /// When the quote was observed. Absent if the remote source omits it.
    pub observed_at: Option<DateTime<Utc>>,
}

/// One historical sample for one variant at one location.
///
/// At the 24-hour time scale the remote API returns one row per day per
/// quality tier, so multiple points may share a calendar day.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub avg_price: f64,
    pub item_count: u64,
}

/// Reduction of a set of history points for one variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Aggregate {
    /// Mean of `avg_price` across points with a positive price; 0 if none.
    pub avg_price: f64,
    /// Mean, across distinct calendar days present in the sample, of the
    /// per-day sums of `item_count`.
    pub avg_sold_per_day: f64,
    /// Which fallback window produced this aggregate; 0 if none qualified.
    pub window_days: u32,
    /// Points that satisfied the window's recency cutoff.
    pub points_used: usize,
}

impl Aggregate {
    /// The "insufficient market activity" marker returned when every
    /// fallback window fails to qualify.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn has_signal(&self) -> bool {
        self.window_days > 0
    }
}

// ---------------------------------------------------------------------------
// Profit evaluation
// ---------------------------------------------------------------------------

/// A fully evaluated, admitted flip candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitRow {
    pub item_id: String,
    pub tier: u8,
    pub enchantment: u8,
    /// Current buy-side price at the purchase location.
    pub buy_price: i64,
    /// When the buy-side quote was observed, if known.
    pub buy_date: Option<DateTime<Utc>>,
    /// Historical average resale price.
    pub avg_price: f64,
    pub avg_sold_per_day: f64,
    /// `((avg_price - buy_price) / buy_price) * 100`. Only constructed
    /// when `buy_price > 0`.
    pub profit_percent: f64,
}

/// Why a variant did not make it into the ranked result set.
///
/// Not an error: an operator must be able to tell *why* a candidate
/// is absent, not just that it is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    NoBuyQuote,
    NoHistorySignal,
    InsufficientLiquidity { sold_per_day: f64 },
    MarginBelowThreshold { profit_percent: f64 },
}

impl SkipReason {
    /// Stable label used for grouping in reports and logs.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::NoBuyQuote => "no buy-side quote",
            SkipReason::NoHistorySignal => "no historical price signal",
            SkipReason::InsufficientLiquidity { .. } => "insufficient liquidity",
            SkipReason::MarginBelowThreshold { .. } => "margin below threshold",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientLiquidity { sold_per_day } => {
                write!(f, "{} ({sold_per_day:.2}/day)", self.label())
            }
            SkipReason::MarginBelowThreshold { profit_percent } => {
                write!(f, "{} ({profit_percent:+.1}%)", self.label())
            }
            _ => write!(f, "{}", self.label()),
        }
    }
}

/// A variant together with the reason it was filtered out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedVariant {
    pub item_id: String,
    pub reason: SkipReason,
}

/// The complete outcome of one scan: ranked rows, per-variant skips,
/// and enough context for the reporter and dashboard to render alone.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub buy_location: String,
    pub sell_location: String,
    pub min_profit_percent: f64,
    pub variants_scanned: usize,
    pub rows: Vec<ProfitRow>,
    pub skipped: Vec<SkippedVariant>,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Progress side-channel
// ---------------------------------------------------------------------------

/// Lock-free progress counters shared between the pipeline and the
/// dashboard poller. One instance lives for the process lifetime and
/// is reset at the start of each scan.
#[derive(Debug, Default)]
pub struct ScanProgress {
    total: AtomicU64,
    done: AtomicU64,
    running: AtomicBool,
}

/// Point-in-time copy of the counters, safe to serialize.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub done: u64,
    pub running: bool,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new scan over `total` variants.
    pub fn reset(&self, total: usize) {
        self.total.store(total as u64, Ordering::SeqCst);
        self.done.store(0, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    /// Record one variant as fully processed.
    pub fn inc_done(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total.load(Ordering::SeqCst),
            done: self.done.load(Ordering::SeqCst),
            running: self.running.load(Ordering::SeqCst),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal faults. Everything else in the pipeline degrades per-variant
/// instead of erroring.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid tier range: min {min} > max {max}")]
    InvalidTierRange { min: u8, max: u8 },

    #[error("item catalog resolved to an empty base-code list")]
    EmptyCatalog,

    #[error("configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
