use axum::routing::{get, post};
use axum::Router;

use super::{handlers, AppState};

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/rings", get(handlers::rings::list_rings))
        .route("/rings/:ring_number", get(handlers::rings::get_ring))
        .route("/rings/:ring_number/raw/:kind", get(handlers::rings::get_raw_data))
        .route("/warnings", get(handlers::warnings::list_warnings))
        .route("/warnings/stats", get(handlers::warnings::warning_stats))
        .route("/warnings/:warning_id", get(handlers::warnings::get_warning))
        .route("/warnings/:warning_id/acknowledge", post(handlers::warnings::acknowledge))
        .route("/warnings/:warning_id/resolve", post(handlers::warnings::resolve))
        .route("/predictions/latest", get(handlers::predictions::latest))
        .route("/predictions/ring/:ring_number", get(handlers::predictions::for_ring))
        .route("/work-orders", get(handlers::work_orders::list))
        .route("/work-orders/:work_order_id", get(handlers::work_orders::get))
        .route("/logs", post(handlers::logs::ingest))
        .route("/logs/recent", get(handlers::logs::recent))
        .route("/health", get(handlers::health::basic))
        .route("/health/detailed", get(handlers::health::detailed))
        .with_state(state)
}
