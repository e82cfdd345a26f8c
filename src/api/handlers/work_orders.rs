//! Work-order read endpoints (supplemented, section 2b/4.9). Generation
//! itself happens off the warning engine's `on_warnings` hook, not via the
//! API; these routes expose the resulting queue.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::types::{WorkOrder, WorkOrderStatus};

use super::super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<WorkOrderStatus>,
}

pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Result<Json<Vec<WorkOrder>>, ApiError> {
    Ok(Json(state.store.list_work_orders(query.status)?))
}

pub async fn get(State(state): State<AppState>, Path(work_order_id): Path<Uuid>) -> Result<Json<WorkOrder>, ApiError> {
    let order = state
        .store
        .get_work_order(work_order_id)?
        .ok_or_else(|| ApiError::not_found(format!("/work-orders/{work_order_id}"), "work order not found"))?;
    Ok(Json(order))
}
