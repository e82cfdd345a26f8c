//! Warning listing, lookup, lifecycle transitions, and statistics
//! (section 6).

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::warning::WarningFilter;
use crate::types::{now, WarningEvent, WarningLevel, WarningStatus, WarningType};

use super::super::{ApiError, AppState};
use super::Pagination;

#[derive(Debug, Deserialize)]
pub struct ListWarningsQuery {
    #[serde(flatten)]
    pub page: Pagination,
    pub level: Option<WarningLevel>,
    #[serde(rename = "type")]
    pub warning_type: Option<WarningType>,
    pub status: Option<WarningStatus>,
    pub ring_number: Option<u64>,
    pub indicator_name: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ListWarningsResponse {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub warnings: Vec<WarningEvent>,
}

pub async fn list_warnings(State(state): State<AppState>, Query(query): Query<ListWarningsQuery>) -> Result<Json<ListWarningsResponse>, ApiError> {
    let filter = WarningFilter {
        level: query.level,
        warning_type: query.warning_type,
        status: query.status,
        ring_number: query.ring_number,
        indicator_name: query.indicator_name.clone(),
        start_time: query.start_time,
        end_time: query.end_time,
    };
    let warnings = state.store.list_warning_events(&filter)?;
    let total = warnings.len();
    let (page_warnings, total_pages) = query.page.paginate(&warnings);
    Ok(Json(ListWarningsResponse {
        total,
        page: query.page.page(),
        page_size: query.page.clamped_page_size(),
        total_pages,
        warnings: page_warnings,
    }))
}

pub async fn get_warning(State(state): State<AppState>, Path(warning_id): Path<Uuid>) -> Result<Json<WarningEvent>, ApiError> {
    let event = state
        .store
        .get_warning_event(warning_id)?
        .ok_or_else(|| ApiError::not_found(format!("/warnings/{warning_id}"), "warning not found"))?;
    Ok(Json(event))
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub user_id: String,
    pub notes: Option<String>,
}

pub async fn acknowledge(
    State(state): State<AppState>,
    Path(warning_id): Path<Uuid>,
    Json(body): Json<AcknowledgeRequest>,
) -> Result<Json<WarningEvent>, ApiError> {
    let path = format!("/warnings/{warning_id}/acknowledge");
    let mut event = state.store.get_warning_event(warning_id)?.ok_or_else(|| ApiError::not_found(&path, "warning not found"))?;
    event.acknowledge(&body.user_id, body.notes, now()).map_err(|e| ApiError::validation(&path, e.to_string()))?;
    state.store.update_warning_event(&event)?;
    Ok(Json(event))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub mark_as_false_positive: bool,
}

pub async fn resolve(
    State(state): State<AppState>,
    Path(warning_id): Path<Uuid>,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<WarningEvent>, ApiError> {
    let path = format!("/warnings/{warning_id}/resolve");
    let mut event = state.store.get_warning_event(warning_id)?.ok_or_else(|| ApiError::not_found(&path, "warning not found"))?;
    event.resolve(body.mark_as_false_positive, now()).map_err(|e| ApiError::validation(&path, e.to_string()))?;
    state.store.update_warning_event(&event)?;
    Ok(Json(event))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
pub struct WarningStatsResponse {
    pub total: usize,
    pub by_level: std::collections::HashMap<String, usize>,
    pub by_type: std::collections::HashMap<String, usize>,
    pub by_status: std::collections::HashMap<String, usize>,
}

pub async fn warning_stats(State(state): State<AppState>, Query(query): Query<StatsQuery>) -> Result<Json<WarningStatsResponse>, ApiError> {
    let filter = WarningFilter { start_time: query.start_time, end_time: query.end_time, ..Default::default() };
    let warnings = state.store.list_warning_events(&filter)?;

    let mut stats = WarningStatsResponse { total: warnings.len(), ..Default::default() };
    for w in &warnings {
        *stats.by_level.entry(format!("{:?}", w.warning_level)).or_insert(0) += 1;
        *stats.by_type.entry(format!("{:?}", w.warning_type)).or_insert(0) += 1;
        *stats.by_status.entry(format!("{:?}", w.status)).or_insert(0) += 1;
    }
    Ok(Json(stats))
}
