//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field carries a serde default, so a partial file (or none at
//! all) yields a runnable configuration. Validation happens once, up
//! front: a malformed range or threshold aborts the run before any
//! network activity instead of producing a misleading empty report.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::types::ScanError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub market: MarketConfig,
    pub variants: VariantConfig,
    pub pricing: PricingConfig,
    pub history: HistoryConfig,
    pub filters: FilterConfig,
    pub scan: ScanConfig,
    pub dashboard: DashboardConfig,
}

/// Which two locations the scanner compares.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarketConfig {
    /// City whose current sell orders we would buy from.
    pub buy_location: String,
    /// Reference resale market whose history we average.
    pub sell_location: String,
    pub api_base_url: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            buy_location: "Lymhurst".to_string(),
            sell_location: "Black Market".to_string(),
            api_base_url: "https://west.albion-online-data.com".to_string(),
        }
    }
}

/// Item catalog and variant generation ranges.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VariantConfig {
    /// Flat file of base item codes, one per line. Missing file falls
    /// back to a single built-in code.
    pub catalog_path: String,
    pub min_tier: u8,
    pub max_tier: u8,
    pub max_enchant: u8,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            catalog_path: "items.txt".to_string(),
            min_tier: 4,
            max_tier: 8,
            max_enchant: 3,
        }
    }
}

/// Current-price quote selection.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PricingConfig {
    /// Maximum age of a quote still trusted for price-minimization.
    /// Older quotes are only used when nothing fresh exists.
    pub freshness_days: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { freshness_days: 90 }
    }
}

/// Historical-activity fallback ladder.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    /// Candidate windows in days, tried in the order given.
    pub windows: Vec<u32>,
    /// Minimum points within the window for it to qualify.
    pub min_points: usize,
    /// Courtesy pause between ladder attempts for one item.
    pub retry_delay_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            windows: vec![14, 30, 60],
            min_points: 1,
            retry_delay_secs: 2,
        }
    }
}

/// Admission thresholds for the profit engine.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterConfig {
    pub min_profit_percent: f64,
    /// Minimum average units sold per day at the resale market.
    pub min_sold_per_day: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_profit_percent: 10.0,
            min_sold_per_day: 0.1,
        }
    }
}

/// Remote-call limits.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// Concurrent in-flight history lookups. The remote API rate-limits
    /// per IP, so this is the only throttle besides the ladder delay.
    pub concurrency: usize,
    pub request_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            request_timeout_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5173,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file. A missing file is not an
    /// error; the built-in defaults describe a complete scan.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!(path, "No config file found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Reject configurations that would make the run meaningless.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.variants.min_tier > self.variants.max_tier {
            return Err(ScanError::InvalidTierRange {
                min: self.variants.min_tier,
                max: self.variants.max_tier,
            });
        }
        if self.history.windows.is_empty() {
            return Err(ScanError::Config(
                "history.windows must name at least one window".to_string(),
            ));
        }
        if self.history.windows.iter().any(|w| *w == 0) {
            return Err(ScanError::Config(
                "history.windows entries must be positive".to_string(),
            ));
        }
        if self.history.min_points == 0 {
            return Err(ScanError::Config(
                "history.min_points must be at least 1".to_string(),
            ));
        }
        if self.scan.concurrency == 0 {
            return Err(ScanError::Config(
                "scan.concurrency must be at least 1".to_string(),
            ));
        }
        if self.scan.request_timeout_secs == 0 {
            return Err(ScanError::Config(
                "scan.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.pricing.freshness_days <= 0 {
            return Err(ScanError::Config(
                "pricing.freshness_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.market.buy_location, "Lymhurst");
        assert_eq!(cfg.market.sell_location, "Black Market");
        assert_eq!(cfg.variants.min_tier, 4);
        assert_eq!(cfg.variants.max_tier, 8);
        assert_eq!(cfg.history.windows, vec![14, 30, 60]);
        assert_eq!(cfg.filters.min_profit_percent, 10.0);
        assert_eq!(cfg.filters.min_sold_per_day, 0.1);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [market]
            buy_location = "Martlock"

            [filters]
            min_profit_percent = 25.0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.market.buy_location, "Martlock");
        assert_eq!(cfg.market.sell_location, "Black Market");
        assert_eq!(cfg.filters.min_profit_percent, 25.0);
        assert_eq!(cfg.filters.min_sold_per_day, 0.1);
        assert_eq!(cfg.history.retry_delay_secs, 2);
    }

    #[test]
    fn test_invalid_tier_range_rejected() {
        let mut cfg = AppConfig::default();
        cfg.variants.min_tier = 8;
        cfg.variants.max_tier = 4;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            ScanError::InvalidTierRange { min: 8, max: 4 }
        ));
    }

    #[test]
    fn test_empty_windows_rejected() {
        let mut cfg = AppConfig::default();
        cfg.history.windows.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut cfg = AppConfig::default();
        cfg.scan.concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let cfg = AppConfig::load("definitely_not_here.toml").unwrap();
        assert_eq!(cfg.variants.max_enchant, 3);
    }
}
