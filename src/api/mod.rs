//! Query API (section 6): resource-oriented REST endpoints backed by the
//! persistent store, built with `axum`/`tower`/`tower-http` per the
//! reference's existing stack (`examples` `api::routes`/`api::handlers`
//! module split, generalized from one dashboard's state to this
//! platform's store/engine/scheduler handles).

pub mod handlers;
mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::buffer::BufferWriter;
use crate::notification::NotificationRegistry;
use crate::scheduler::Scheduler;
use crate::storage::Store;
use crate::warning::engine::WarningEngine;
use crate::work_order::WorkOrderGenerator;

/// Everything a request handler may need, constructed once at startup and
/// cheaply cloned (every field is `Arc`-backed) into axum's router state.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub buffer: Arc<BufferWriter>,
    pub warning_engine: Arc<WarningEngine>,
    pub work_orders: Arc<WorkOrderGenerator>,
    pub notifications: NotificationRegistry,
    pub scheduler: Arc<Scheduler>,
    pub started_at: Instant,
}

/// Uniform error response body (section 6: "structured `{error, message,
/// path}` bodies").
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub path: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: String,
    pub path: String,
}

impl ApiError {
    pub fn not_found(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, error: "not_found".into(), message: message.into(), path: path.into() }
    }

    pub fn bad_request(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, error: "bad_request".into(), message: message.into(), path: path.into() }
    }

    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status: StatusCode::UNPROCESSABLE_ENTITY, error: "validation_error".into(), message: message.into(), path: path.into() }
    }

    pub fn internal(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, error: "internal_error".into(), message: message.into(), path: path.into() }
    }
}

impl From<crate::storage::StorageError> for ApiError {
    fn from(err: crate::storage::StorageError) -> Self {
        ApiError::internal("", err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.error, message: self.message, path: self.path };
        (self.status, Json(body)).into_response()
    }
}

/// Builds the full application router, nested under `/api/v1` with a
/// permissive CORS layer and request tracing, matching the reference's
/// `create_app` layering.
pub fn create_app(state: AppState) -> axum::Router {
    axum::Router::new()
        .nest("/api/v1", routes::api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
