//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and
//! exercise the `/api/v1/*` endpoints using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use shield_edge::api::{create_app, AppState};
use shield_edge::buffer::BufferWriter;
use shield_edge::config::thresholds::ThresholdCache;
use shield_edge::notification::channels::{EmailSink, LoggingEmailTransport, LoggingSmsTransport, SmsSink};
use shield_edge::notification::NotificationRegistry;
use shield_edge::scheduler::Scheduler;
use shield_edge::storage::Store;
use shield_edge::warning::engine::WarningEngine;
use shield_edge::warning::predictive_checker::StorePredictionSource;
use shield_edge::work_order::WorkOrderGenerator;

fn build_state() -> AppState {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path()).expect("open store");
    // Leak the tempdir so the sled database stays on disk for the test's lifetime.
    std::mem::forget(dir);

    let buffer = Arc::new(BufferWriter::with_defaults(store.clone()));
    let notifications = NotificationRegistry::new(
        Arc::new(EmailSink::new(LoggingEmailTransport)),
        Arc::new(SmsSink::new(LoggingSmsTransport)),
    );
    let threshold_cache = Arc::new(ThresholdCache::new(Vec::new()));
    let prediction_source = Arc::new(StorePredictionSource { store: store.clone() });
    let warning_engine = Arc::new(WarningEngine::new(store.clone(), threshold_cache, prediction_source, notifications.clone()));
    let work_orders = Arc::new(WorkOrderGenerator::new(store.clone()));

    AppState {
        store,
        buffer,
        warning_engine,
        work_orders,
        notifications,
        scheduler: Arc::new(Scheduler::new()),
        started_at: Instant::now(),
    }
}

#[tokio::test]
async fn basic_health_reports_ok() {
    let app = create_app(build_state());
    let response = app
        .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn detailed_health_reports_substructure() {
    let app = create_app(build_state());
    let response = app
        .oneshot(Request::builder().uri("/api/v1/health/detailed").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json.get("storage").is_some());
    assert!(json.get("buffer").is_some());
    assert!(json.get("scheduler").is_some());
}

#[tokio::test]
async fn list_rings_on_empty_store_is_empty_page() {
    let app = create_app(build_state());
    let response = app
        .oneshot(Request::builder().uri("/api/v1/rings").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total"], 0);
    assert!(json["rings"].as_array().map(|a| a.is_empty()).unwrap_or(false));
}

#[tokio::test]
async fn get_missing_ring_is_404() {
    let app = create_app(build_state());
    let response = app
        .oneshot(Request::builder().uri("/api/v1/rings/9999").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_missing_warning_is_404() {
    let app = create_app(build_state());
    let missing_id = uuid::Uuid::new_v4();
    let response = app
        .oneshot(Request::builder().uri(format!("/api/v1/warnings/{missing_id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_work_orders_on_empty_store_is_empty_array() {
    let app = create_app(build_state());
    let response = app
        .oneshot(Request::builder().uri("/api/v1/work-orders").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json.as_array().map(|a| a.is_empty()).unwrap_or(false));
}
