//! Manual log ingestion and recent-log lookup (section 6).
//!
//! Ingestion reuses the buffer writer's own persistence semantics rather
//! than a separate direct-insert path, so manually entered samples are
//! subject to the same batching/backpressure behavior as collector
//! output. The "recent" query is a straight reverse-chronological
//! iteration capped at `limit` (section 9's resolved open question) —
//! not an overfetch-then-limit pattern.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::{now, Payload, Sample, SampleKind};

use super::super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ManualLogEntry {
    pub source_id: String,
    pub operator_id: String,
    pub payload: Payload,
    pub timestamp: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub entries: Vec<ManualLogEntry>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub accepted: usize,
    pub rejected: usize,
}

pub async fn ingest(State(state): State<AppState>, Json(body): Json<IngestRequest>) -> Result<Json<IngestResponse>, ApiError> {
    if body.entries.is_empty() {
        return Err(ApiError::validation("/logs", "entries must not be empty"));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    for entry in body.entries {
        let ts = entry.timestamp.unwrap_or_else(now);
        let mut sample = Sample::new(entry.source_id, ts, entry.payload);
        sample.quality_flag = crate::types::QualityFlag::Raw;
        tracing::info!(operator = %entry.operator_id, "manual log entry accepted");
        if state.buffer.add(sample).await {
            accepted += 1;
        } else {
            rejected += 1;
        }
    }
    Ok(Json(IngestResponse { accepted, rejected }))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub kind: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

pub async fn recent(State(state): State<AppState>, Query(query): Query<RecentQuery>) -> Result<Json<Vec<Sample>>, ApiError> {
    let kind = match query.kind.as_str() {
        "plc" => SampleKind::Plc,
        "attitude" => SampleKind::Attitude,
        "monitoring" => SampleKind::Monitoring,
        other => return Err(ApiError::bad_request("/logs/recent", format!("unknown data kind '{other}'"))),
    };
    let limit = query.limit.clamp(1, 1000);
    let mut samples = state.store.samples_in_range(kind, 0.0, f64::MAX)?;
    samples.sort_by(|a, b| b.timestamp.partial_cmp(&a.timestamp).unwrap());
    samples.truncate(limit);
    Ok(Json(samples))
}
