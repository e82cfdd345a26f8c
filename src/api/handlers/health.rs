//! Health endpoints (section 6): basic and detailed views, each
//! sub-probe wrapped with a 1s timeout. Per section 9's resolved open
//! question, the response is a plain `#[derive(Serialize)]` struct —
//! there is no dynamic `.dict()`/`model_dump()` step to replicate since
//! serialization here is derived, not called on a dynamic object.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::config::defaults::HEALTH_PROBE_TIMEOUT_SECONDS;

use super::super::AppState;

#[derive(Debug, Serialize)]
pub struct BasicHealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
}

pub async fn basic(State(state): State<AppState>) -> Json<BasicHealthResponse> {
    Json(BasicHealthResponse { status: "ok".to_string(), uptime_seconds: state.started_at.elapsed().as_secs() })
}

#[derive(Debug, Serialize)]
pub struct ProbeResult {
    pub healthy: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub storage: ProbeResult,
    pub buffer: ProbeResult,
    pub scheduler: ProbeResult,
}

async fn with_timeout<F, T>(probe: F) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs_f64(HEALTH_PROBE_TIMEOUT_SECONDS), probe).await.ok()
}

pub async fn detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let storage = with_timeout(async { state.store.db.was_recovered() })
        .await
        .map(|recovered| ProbeResult { healthy: true, detail: format!("recovered={recovered}") })
        .unwrap_or_else(|| ProbeResult { healthy: false, detail: "probe timed out".to_string() });

    let buffer_stats = state.buffer.stats();
    let buffer = with_timeout(async { buffer_stats.drop_rate() })
        .await
        .map(|drop_rate| ProbeResult { healthy: drop_rate < 0.5, detail: format!("drop_rate={drop_rate:.4}") })
        .unwrap_or_else(|| ProbeResult { healthy: false, detail: "probe timed out".to_string() });

    let scheduler_status = with_timeout(async { state.scheduler.status() })
        .await
        .map(|status| ProbeResult { healthy: status.running, detail: format!("{}/{} tasks enabled", status.enabled_tasks, status.total_tasks) })
        .unwrap_or_else(|| ProbeResult { healthy: false, detail: "probe timed out".to_string() });

    let status = if storage.healthy && buffer.healthy && scheduler_status.healthy { "ok" } else { "degraded" }.to_string();

    Json(DetailedHealthResponse { status, uptime_seconds: state.started_at.elapsed().as_secs(), storage, buffer, scheduler: scheduler_status })
}
