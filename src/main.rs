//! flipscan — Albion Online market flip scanner.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! runs a scan of the configured item catalog, prints the ranked
//! report, and (when the dashboard is enabled) keeps serving cached
//! results and re-scanning on demand until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

use flipscan::catalog;
use flipscan::config::AppConfig;
use flipscan::dashboard;
use flipscan::dashboard::routes::DashboardState;
use flipscan::engine;
use flipscan::market::albion::AlbionDataClient;
use flipscan::report;
use flipscan::types::ScanProgress;

const BANNER: &str = r#"
   __ _ _
  / _| (_)_ __  ___  ___ __ _ _ __
 | |_| | | '_ \/ __|/ __/ _` | '_ \
 |  _| | | |_) \__ \ (_| (_| | | | |
 |_| |_|_| .__/|___/\___\__,_|_| |_|
         |_|
  city buy → Black Market resale
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");

    // Configuration faults are fatal before any network activity;
    // better no report than a misleading empty one.
    cfg.validate()?;

    let base_codes = catalog::load_base_codes(&cfg.variants.catalog_path)?;
    info!(
        base_codes = base_codes.len(),
        buy = %cfg.market.buy_location,
        sell = %cfg.market.sell_location,
        tiers = format!("{}-{}", cfg.variants.min_tier, cfg.variants.max_tier),
        max_enchant = cfg.variants.max_enchant,
        "flipscan starting up"
    );

    let client = AlbionDataClient::new(
        &cfg.market.api_base_url,
        cfg.scan.request_timeout_secs,
        cfg.pricing.freshness_days,
    )?;

    let progress = Arc::new(ScanProgress::new());
    let state = Arc::new(DashboardState::new(progress.clone()));

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port)?;
    }

    // -- First scan -------------------------------------------------------

    scan_and_publish(&client, &cfg, &base_codes, &progress, &state).await?;

    if !cfg.dashboard.enabled {
        return Ok(());
    }

    // -- Serve until shutdown ---------------------------------------------

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Serving cached results. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = state.refresh.notified() => {
                info!("Refresh requested");
                if let Err(e) = scan_and_publish(&client, &cfg, &base_codes, &progress, &state).await {
                    error!(error = %e, "Scan failed");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("flipscan shut down cleanly.");
    Ok(())
}

/// Run one scan, print the report, and publish it to the dashboard.
async fn scan_and_publish(
    client: &AlbionDataClient,
    cfg: &AppConfig,
    base_codes: &[String],
    progress: &Arc<ScanProgress>,
    state: &Arc<DashboardState>,
) -> Result<()> {
    let scan = engine::run_scan(client, cfg, base_codes, progress).await?;
    println!("{}", report::render(&scan));
    state.publish(scan).await;
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("flipscan=info"));

    let json_logging = std::env::var("FLIPSCAN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
