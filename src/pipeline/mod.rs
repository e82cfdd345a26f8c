//! Pipeline coordinator: wires the per-sample quality stage, the buffer
//! writer, the ring aligner, the warning engine, and the work-order
//! generator into the two periodic operations the scheduler drives —
//! mirroring the reference's `pipeline::PipelineCoordinator`
//! (`examples/ashton-dyke-SAIREN-OS/src/pipeline/coordinator.rs`)
//! generalized from one WITS-packet-at-a-time loop to this platform's
//! two-cadence shape (per-sample ingestion, per-ring alignment).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::aligner::{attitude_aggregator, boundary, derived, plc_aggregator, settlement, summary_writer};
use crate::buffer::BufferWriter;
use crate::config::geometry::AlignmentGeometry;
use crate::config::reasonableness::ReasonablenessConfig;
use crate::quality::interpolator::{self, InterpolatorConfig};
use crate::quality::metrics::QualityMetrics;
use crate::quality::reasonableness::{self, PlcSnapshot};
use crate::quality::QualityPipeline;
use crate::storage::Store;
use crate::types::{
    now, AttitudeFeatures, CompletenessFlag, DerivedIndicators, QualityFlag, RingSummary, Sample, SampleKind,
    SettlementFeatures, TagStats, Timestamp,
};
use crate::warning::engine::WarningEngine;
use crate::work_order::WorkOrderGenerator;

/// Tunables that vary per deployment site but aren't themselves one of
/// the five YAML documents: which PLC tags feed derived indicators, what
/// stable names raw tags remap onto, which geological zone this machine
/// currently sits in (used as the warning engine's zone key), and the
/// gap-filling window the per-tag interpolation pass runs before
/// aggregation.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub tag_remap: HashMap<String, String>,
    pub settlement: settlement::SettlementAssociatorConfig,
    pub geological_zone: Option<String>,
    pub interpolator: InterpolatorConfig,
    pub reasonableness: ReasonablenessConfig,
}

/// Everything the per-sample and per-ring operations need, constructed
/// once at startup and shared (via `Arc`) across the collector-consumer
/// task and the scheduler's alignment task.
pub struct PipelineRuntime {
    store: Store,
    buffer: Arc<BufferWriter>,
    quality: QualityPipeline,
    quality_metrics: Arc<QualityMetrics>,
    warning_engine: Arc<WarningEngine>,
    work_orders: Arc<WorkOrderGenerator>,
    geometry: AlignmentGeometry,
    config: PipelineConfig,
    previous_ring_end: Mutex<Option<Timestamp>>,
    next_ring_number: AtomicU64,
    invalid_boundary_count: AtomicU64,
}

impl PipelineRuntime {
    pub fn new(
        store: Store,
        buffer: Arc<BufferWriter>,
        quality: QualityPipeline,
        warning_engine: Arc<WarningEngine>,
        work_orders: Arc<WorkOrderGenerator>,
        geometry: AlignmentGeometry,
        config: PipelineConfig,
    ) -> Self {
        let next_ring_number = store.latest_ring_summary().ok().flatten().map_or(1, |s| s.ring_number + 1);
        Self {
            store,
            buffer,
            quality,
            quality_metrics: Arc::new(QualityMetrics::new()),
            warning_engine,
            work_orders,
            geometry,
            config,
            previous_ring_end: Mutex::new(None),
            next_ring_number: AtomicU64::new(next_ring_number),
            invalid_boundary_count: AtomicU64::new(0),
        }
    }

    pub fn quality_metrics(&self) -> &QualityMetrics {
        &self.quality_metrics
    }

    /// Per-sample stage (section 4.2, section 4.3): validate + calibrate,
    /// then hand to the buffer writer. Series-level interpolation and the
    /// multi-tag reasonableness check run separately, ahead of
    /// aggregation, once a ring's samples are all on disk
    /// (`interpolate_plc_series`, `check_reasonableness`).
    pub async fn ingest_sample(&self, sample: Sample) -> bool {
        let processed = self.quality.process(sample, &self.quality_metrics);
        self.buffer.add(processed).await
    }

    /// Runs the full per-ring operation: detect the next boundary,
    /// aggregate features, compute derived indicators and settlement
    /// association, upsert the summary, then evaluate it through the
    /// warning engine and the work-order generator's `on_warnings` hook
    /// (already registered at startup). Registered with the scheduler as
    /// the `align_ring` task (section 4.10).
    pub async fn align_next_ring(&self) -> anyhow::Result<()> {
        let now_ts = now();
        let previous_ring_end = self.previous_ring_end.lock().expect("previous_ring_end lock poisoned").unwrap_or(now_ts - self.geometry.typical_ring_duration_seconds);

        let advance_series = self.load_advance_series(previous_ring_end, now_ts)?;
        let assembly_series = self.load_assembly_series(previous_ring_end, now_ts)?;

        let detected = boundary::detect_boundary(&advance_series, &assembly_series, previous_ring_end, now_ts, &self.geometry);
        if !detected.valid {
            self.invalid_boundary_count.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                start = detected.start_time,
                end = detected.end_time,
                method = detected.method.as_str(),
                "ring boundary failed validation; aggregating anyway with downgraded completeness"
            );
        }
        if detected.end_time > now_ts {
            // Boundary not yet closed — nothing to align this tick.
            return Ok(());
        }

        let ring_number = self.next_ring_number.fetch_add(1, Ordering::SeqCst);
        let summary = self.aggregate_ring(ring_number, detected.start_time, detected.end_time, detected.method.as_str(), now_ts)?;
        let stored = summary_writer::upsert(&self.store, summary, now_ts)?;

        *self.previous_ring_end.lock().expect("previous_ring_end lock poisoned") = Some(detected.end_time);

        let warnings = self.warning_engine.evaluate_ring(&stored, now_ts).await?;
        tracing::info!(ring_number, warnings = warnings.len(), completeness = ?stored.data_completeness_flag, "ring aligned and evaluated");
        Ok(())
    }

    fn aggregate_ring(
        &self,
        ring_number: u64,
        start: Timestamp,
        end: Timestamp,
        boundary_method: &str,
        now_ts: Timestamp,
    ) -> anyhow::Result<RingSummary> {
        let plc_samples = self.store.samples_in_range(SampleKind::Plc, start, end)?;
        let attitude_samples = self.store.samples_in_range(SampleKind::Attitude, start, end)?;

        let interpolated_plc_samples = self.interpolate_plc_series(plc_samples);
        let plc_features = plc_aggregator::aggregate_all(&interpolated_plc_samples, &self.config.tag_remap);
        self.check_reasonableness(&plc_features);
        let attitude_features: AttitudeFeatures = attitude_aggregator::aggregate(&attitude_samples);

        let duration_hours = (end - start) / 3600.0;
        let derived_inputs = derived::DerivedInputs {
            mean_power_kw: plc_features.get("power_total").map(|s| s.mean),
            duration_hours: Some(duration_hours),
            grout_volume_m3: plc_features.get("grout_volume").map(|s| s.mean),
            tail_void_volume_m3: None,
            mean_torque_knm: plc_features.get("torque_total").map(|s| s.mean),
            mean_thrust_kn: plc_features.get("thrust_total").map(|s| s.mean),
            mean_advance_speed_m_per_min: plc_features.get("advance_speed").map(|s| s.mean),
            mean_cutterhead_power_kw: plc_features.get("cutterhead_power").map(|s| s.mean),
        };
        let derived_indicators: DerivedIndicators = derived::compute(&derived_inputs, &self.geometry);

        let monitoring_window = self.store.samples_in_range(
            SampleKind::Monitoring,
            end,
            end + self.widest_lag_seconds(),
        )?;
        let settlement_features: SettlementFeatures = settlement::associate(&monitoring_window, end, &self.config.settlement);

        Ok(RingSummary {
            ring_number,
            start_time: start,
            end_time: end,
            boundary_method: Some(boundary_method.to_string()),
            plc_features,
            attitude_features,
            derived_indicators,
            settlement: settlement_features,
            data_completeness_flag: CompletenessFlag::Incomplete,
            geological_zone: self.config.geological_zone.clone(),
            synced_to_cloud: false,
            created_at: now_ts,
            updated_at: now_ts,
        })
    }

    /// Fills per-tag gaps ahead of aggregation (section 4.2): groups the
    /// ring's raw PLC samples by tag, runs the gap-filling interpolator
    /// over each chronologically-sorted series, and records how many
    /// points each tag received to the quality metrics sink.
    fn interpolate_plc_series(&self, samples: Vec<Sample>) -> Vec<Sample> {
        let mut grouped: HashMap<String, Vec<Sample>> = HashMap::new();
        for sample in samples {
            if let Some(tag) = sample.tag_name() {
                grouped.entry(tag.to_string()).or_default().push(sample);
            }
        }

        let mut out = Vec::new();
        for (tag, mut series) in grouped {
            series.sort_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).expect("sample timestamps are finite"));
            let filled = interpolator::interpolate_series(&series, &self.config.interpolator);
            for sample in &filled {
                if sample.quality_flag == QualityFlag::Interpolated {
                    self.quality_metrics.record_interpolation(&tag);
                }
            }
            out.extend(filled);
        }
        out
    }

    /// Runs the physics-derived reasonableness rules against this ring's
    /// aggregated PLC means (section 4.2). Purely observational: outcomes
    /// go to the quality metrics sink and the log, never to the summary.
    fn check_reasonableness(&self, plc_features: &HashMap<String, TagStats>) {
        let snapshot = PlcSnapshot {
            thrust_total_kn: plc_features.get("thrust_total").map(|s| s.mean),
            penetration_rate_mm_per_min: plc_features.get("penetration_rate").map(|s| s.mean),
            torque_total_knm: plc_features.get("torque_total").map(|s| s.mean),
            chamber_pressure_bar: plc_features.get("chamber_pressure").map(|s| s.mean),
            depth_m: plc_features.get("depth").map(|s| s.mean),
            power_consumption_kw: plc_features.get("power_total").map(|s| s.mean),
            advance_speed_m_per_min: plc_features.get("advance_speed").map(|s| s.mean),
            cutterhead_rpm: plc_features.get("cutterhead_rpm").map(|s| s.mean),
        };

        for outcome in reasonableness::check(&self.config.reasonableness, &snapshot) {
            self.quality_metrics.record_reasonableness(outcome.rule, outcome.passed);
            if !outcome.passed {
                tracing::warn!(rule = ?outcome.rule, detail = %outcome.detail, "reasonableness check failed");
            }
        }
    }

    fn widest_lag_seconds(&self) -> f64 {
        let mut max_hours = self.config.settlement.default_lag.max_hours;
        for lag in self.config.settlement.per_sensor_type_lag.values() {
            max_hours = max_hours.max(lag.max_hours);
        }
        max_hours * 3600.0
    }

    fn load_advance_series(&self, start: Timestamp, end: Timestamp) -> anyhow::Result<Vec<boundary::AdvanceSample>> {
        let samples = self.store.samples_in_range_for_tag(SampleKind::Plc, "advance_cumulative", start, end)?;
        Ok(samples
            .iter()
            .filter_map(|s| s.value().map(|v| boundary::AdvanceSample { timestamp: s.timestamp, value_mm: v }))
            .collect())
    }

    fn load_assembly_series(&self, start: Timestamp, end: Timestamp) -> anyhow::Result<Vec<boundary::AssemblySample>> {
        let samples = self.store.samples_in_range_for_tag(SampleKind::Plc, "ring_assembly_active", start, end)?;
        Ok(samples
            .iter()
            .filter_map(|s| s.value().map(|v| boundary::AssemblySample { timestamp: s.timestamp, active: v > 0.5 }))
            .collect())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn buffer(&self) -> &Arc<BufferWriter> {
        &self.buffer
    }

    pub fn work_orders(&self) -> &Arc<WorkOrderGenerator> {
        &self.work_orders
    }

    pub fn invalid_boundary_count(&self) -> u64 {
        self.invalid_boundary_count.load(Ordering::Relaxed)
    }
}
