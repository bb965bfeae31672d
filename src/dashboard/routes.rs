//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

use crate::types::{ProgressSnapshot, ScanProgress, ScanReport};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers and the main loop.
pub struct DashboardState {
    /// The most recent finished scan, if any.
    pub report: RwLock<Option<ScanReport>>,
    pub progress: Arc<ScanProgress>,
    /// Signals the main loop to start a new scan.
    pub refresh: Notify,
    pub scans_run: AtomicU64,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(progress: Arc<ScanProgress>) -> Self {
        Self {
            report: RwLock::new(None),
            progress,
            refresh: Notify::new(),
            scans_run: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Publish a finished scan.
    pub async fn publish(&self, report: ScanReport) {
        *self.report.write().await = Some(report);
        self.scans_run.fetch_add(1, Ordering::SeqCst);
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub scans_run: u64,
    pub scanning: bool,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// Latest scan report, or JSON `null` before the first scan finishes.
pub async fn get_results(State(state): State<AppState>) -> Json<Option<ScanReport>> {
    Json(state.report.read().await.clone())
}

pub async fn get_progress(State(state): State<AppState>) -> Json<ProgressSnapshot> {
    Json(state.progress.snapshot())
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let last_scan_at = state.report.read().await.as_ref().map(|r| r.generated_at);
    Json(StatusResponse {
        scans_run: state.scans_run.load(Ordering::SeqCst),
        scanning: state.progress.is_running(),
        last_scan_at,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Ask the main loop for a fresh scan. A scan already in flight is not
/// interrupted or queued twice.
pub async fn post_refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    if state.progress.is_running() {
        return Json(RefreshResponse {
            status: "already running",
        });
    }
    state.refresh.notify_one();
    Json(RefreshResponse {
        status: "scheduled",
    })
}

pub async fn health() -> &'static str {
    "ok"
}
