//! Prediction lookups (section 6): latest overall, and by-ring.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::storage::prediction::PredictionResult;

use super::super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

pub async fn latest(State(state): State<AppState>, Query(query): Query<LatestQuery>) -> Result<Json<Vec<PredictionResult>>, ApiError> {
    Ok(Json(state.store.latest_predictions_overall(query.limit.min(1000))?))
}

pub async fn for_ring(State(state): State<AppState>, Path(ring_number): Path<u64>) -> Result<Json<Vec<PredictionResult>>, ApiError> {
    Ok(Json(state.store.predictions_for_ring(ring_number)?))
}
