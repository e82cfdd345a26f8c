//! Pipeline Regression Tests
//!
//! Exercises the full per-sample and per-ring path through
//! `PipelineRuntime`: ingest synthetic PLC/attitude/monitoring samples,
//! align a ring, and assert on the resulting summary, warning
//! evaluation, and data integrity (no NaN, a real boundary method, a
//! completeness flag).

use std::sync::Arc;

use shield_edge::aligner::settlement::{LagWindow, SettlementAssociatorConfig};
use shield_edge::buffer::BufferWriter;
use shield_edge::config::geometry::AlignmentGeometry;
use shield_edge::config::thresholds::ThresholdCache;
use shield_edge::notification::channels::{EmailSink, LoggingEmailTransport, LoggingSmsTransport, SmsSink};
use shield_edge::notification::NotificationRegistry;
use shield_edge::pipeline::{PipelineConfig, PipelineRuntime};
use shield_edge::quality::calibrator::Calibrator;
use shield_edge::quality::threshold::ThresholdValidator;
use shield_edge::quality::QualityPipeline;
use shield_edge::storage::Store;
use shield_edge::types::{now, Payload, Sample};
use shield_edge::warning::engine::WarningEngine;
use shield_edge::warning::predictive_checker::StorePredictionSource;
use shield_edge::work_order::WorkOrderGenerator;

fn build_runtime() -> (PipelineRuntime, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path()).expect("open store");

    let buffer = Arc::new(BufferWriter::with_defaults(store.clone()));
    let quality = QualityPipeline::new(ThresholdValidator::new(Default::default()), Calibrator::new(Vec::new()));
    let notifications = NotificationRegistry::new(
        Arc::new(EmailSink::new(LoggingEmailTransport)),
        Arc::new(SmsSink::new(LoggingSmsTransport)),
    );
    let threshold_cache = Arc::new(ThresholdCache::new(Vec::new()));
    let prediction_source = Arc::new(StorePredictionSource { store: store.clone() });
    let warning_engine = Arc::new(WarningEngine::new(store.clone(), threshold_cache, prediction_source, notifications));
    let work_orders = Arc::new(WorkOrderGenerator::new(store.clone()));

    let mut geometry = AlignmentGeometry::default();
    geometry.typical_ring_duration_seconds = 900.0;
    geometry.min_ring_duration_seconds = 60.0;
    geometry.max_ring_duration_seconds = 1800.0;

    // The seeded settlement reading lands within minutes of the detected ring
    // end rather than the default 6-8 hour lag, so narrow the window to match.
    let config = PipelineConfig {
        settlement: SettlementAssociatorConfig {
            default_lag: LagWindow { min_hours: 0.0, max_hours: 1.0 },
            primary_sensor_type: "settlement".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    let runtime = PipelineRuntime::new(store, buffer, quality, warning_engine, work_orders, geometry, config);
    (runtime, dir)
}

/// Feeds a ring's worth of PLC, attitude, and monitoring samples spread
/// over `duration_seconds`, ending at `end_time`.
async fn seed_ring_samples(runtime: &PipelineRuntime, end_time: f64, duration_seconds: f64) {
    let start_time = end_time - duration_seconds;
    let steps = 30;
    for i in 0..steps {
        let t = start_time + duration_seconds * (i as f64 / steps as f64);
        runtime.ingest_sample(Sample::new("plc-test", t, Payload::Plc { tag_name: "thrust_total".into(), value: 18000.0 + i as f64 })).await;
        runtime.ingest_sample(Sample::new("plc-test", t, Payload::Plc { tag_name: "torque_total".into(), value: 3500.0 })).await;
        runtime.ingest_sample(Sample::new("plc-test", t, Payload::Plc { tag_name: "advance_cumulative".into(), value: (t - start_time) * 10.0 })).await;
        runtime.ingest_sample(Sample::new("plc-test", t, Payload::Plc { tag_name: "power_total".into(), value: 900.0 })).await;
        runtime
            .ingest_sample(Sample::new(
                "attitude-test",
                t,
                Payload::Attitude { pitch: 0.1, roll: 0.05, yaw: -0.05, horizontal_deviation: 8.0, vertical_deviation: 5.0, axis_deviation: 9.0 },
            ))
            .await;
    }
    runtime
        .ingest_sample(Sample::new(
            "monitoring-test",
            end_time,
            Payload::Monitoring { sensor_type: "settlement".into(), sensor_location: Some("p1".into()), value: -1.2, unit: "mm".into() },
        ))
        .await;
}

#[tokio::test]
async fn align_next_ring_produces_stored_summary() {
    let (runtime, _dir) = build_runtime();
    let now_ts = now();
    seed_ring_samples(&runtime, now_ts - 1.0, 900.0).await;
    runtime.buffer().flush(now_ts).expect("flush buffered samples to store");

    runtime.align_next_ring().await.expect("ring alignment should succeed with seeded data");

    let summary = runtime
        .store()
        .latest_ring_summary()
        .expect("query latest ring summary")
        .expect("a ring summary should have been written");

    assert_eq!(summary.ring_number, 1);
    let method = summary.boundary_method.as_deref().expect("boundary method should be recorded");
    assert!(!method.is_empty());

    for (name, value) in summary.indicator_values() {
        assert!(!value.is_nan(), "indicator {name} should not be NaN");
    }

    assert!(
        !matches!(summary.data_completeness_flag, shield_edge::types::CompletenessFlag::Incomplete),
        "a ring seeded with PLC, attitude, and settlement data should not be flagged incomplete"
    );
}

#[tokio::test]
async fn ingest_sample_accepts_well_formed_samples() {
    let (runtime, _dir) = build_runtime();
    let accepted = runtime
        .ingest_sample(Sample::new("plc-test", now(), Payload::Plc { tag_name: "thrust_total".into(), value: 18500.0 }))
        .await;
    assert!(accepted, "a well-formed sample within validation bounds should be buffered");
}

#[tokio::test]
async fn align_next_ring_is_idempotent_when_no_new_data_arrives() {
    let (runtime, _dir) = build_runtime();
    runtime.align_next_ring().await.expect("first alignment should not error even with no data");
    let first_count = runtime.invalid_boundary_count();
    runtime.align_next_ring().await.expect("second alignment should not error");
    assert!(runtime.invalid_boundary_count() >= first_count);
}
