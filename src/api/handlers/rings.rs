//! Ring listing, single-ring lookup, and raw-data slices (section 6).

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::{CompletenessFlag, RingSummary, SampleKind};

use super::super::{ApiError, AppState};
use super::Pagination;

const RAW_DATA_CAP: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct ListRingsQuery {
    #[serde(flatten)]
    pub page: Pagination,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    pub completeness: Option<String>,
    pub geological_zone: Option<String>,
    pub start_ring: Option<u64>,
    pub end_ring: Option<u64>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Serialize)]
pub struct ListRingsResponse {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub rings: Vec<RingSummary>,
}

pub async fn list_rings(State(state): State<AppState>, Query(query): Query<ListRingsQuery>) -> Result<Json<ListRingsResponse>, ApiError> {
    let mut rings = state.store.list_ring_summaries(query.start_ring, query.end_ring)?;

    if let Some(completeness) = &query.completeness {
        let wanted = parse_completeness(completeness).map_err(|e| ApiError::bad_request("/rings", e))?;
        rings.retain(|r| r.data_completeness_flag == wanted);
    }
    if let Some(zone) = &query.geological_zone {
        rings.retain(|r| r.geological_zone.as_deref() == Some(zone.as_str()));
    }

    match query.sort_by.as_deref().unwrap_or("ring_number") {
        "start_time" => rings.sort_by(|a, b| a.start_time.partial_cmp(&b.start_time).unwrap()),
        "created_at" => rings.sort_by(|a, b| a.created_at.partial_cmp(&b.created_at).unwrap()),
        _ => rings.sort_by_key(|r| r.ring_number),
    }
    if query.order == SortOrder::Desc {
        rings.reverse();
    }

    let total = rings.len();
    let (page_rings, total_pages) = query.page.paginate(&rings);
    Ok(Json(ListRingsResponse { total, page: query.page.page(), page_size: query.page.clamped_page_size(), total_pages, rings: page_rings }))
}

fn parse_completeness(value: &str) -> Result<CompletenessFlag, String> {
    match value {
        "complete" => Ok(CompletenessFlag::Complete),
        "partial" => Ok(CompletenessFlag::Partial),
        "incomplete" => Ok(CompletenessFlag::Incomplete),
        other => Err(format!("unknown completeness filter '{other}'")),
    }
}

#[derive(Debug, Deserialize)]
pub struct GetRingQuery {
    #[serde(default)]
    pub include_raw_counts: bool,
}

#[derive(Debug, Serialize)]
pub struct GetRingResponse {
    #[serde(flatten)]
    pub summary: RingSummary,
    pub raw_data_counts: Option<RawDataCounts>,
}

#[derive(Debug, Serialize)]
pub struct RawDataCounts {
    pub plc: usize,
    pub attitude: usize,
    pub monitoring: usize,
}

pub async fn get_ring(
    State(state): State<AppState>,
    Path(ring_number): Path<u64>,
    Query(query): Query<GetRingQuery>,
) -> Result<Json<GetRingResponse>, ApiError> {
    let summary = state
        .store
        .get_ring_summary(ring_number)?
        .ok_or_else(|| ApiError::not_found(format!("/rings/{ring_number}"), "ring not found"))?;

    let raw_data_counts = if query.include_raw_counts {
        Some(RawDataCounts {
            plc: state.store.count_in_range(SampleKind::Plc, summary.start_time, summary.end_time)?,
            attitude: state.store.count_in_range(SampleKind::Attitude, summary.start_time, summary.end_time)?,
            monitoring: state.store.count_in_range(SampleKind::Monitoring, summary.start_time, summary.end_time)?,
        })
    } else {
        None
    };

    Ok(Json(GetRingResponse { summary, raw_data_counts }))
}

#[derive(Debug, Serialize)]
pub struct RawDataResponse {
    pub ring_number: u64,
    pub kind: String,
    pub count: usize,
    pub truncated: bool,
    pub samples: Vec<crate::types::Sample>,
}

pub async fn get_raw_data(
    State(state): State<AppState>,
    Path((ring_number, kind)): Path<(u64, String)>,
) -> Result<Json<RawDataResponse>, ApiError> {
    let summary = state
        .store
        .get_ring_summary(ring_number)?
        .ok_or_else(|| ApiError::not_found(format!("/rings/{ring_number}/raw/{kind}"), "ring not found"))?;

    let sample_kind = match kind.as_str() {
        "plc" => SampleKind::Plc,
        "attitude" => SampleKind::Attitude,
        "monitoring" => SampleKind::Monitoring,
        other => return Err(ApiError::bad_request(format!("/rings/{ring_number}/raw/{kind}"), format!("unknown data kind '{other}'"))),
    };

    let mut samples = state.store.samples_in_range(sample_kind, summary.start_time, summary.end_time)?;
    let truncated = samples.len() > RAW_DATA_CAP;
    samples.truncate(RAW_DATA_CAP);

    Ok(Json(RawDataResponse { ring_number, kind, count: samples.len(), truncated, samples }))
}
