//! Per-sample quality pipeline (section 4.2).
//!
//! Stages run in order and may short-circuit: threshold validation,
//! interpolation (series-level), calibration, and reasonableness
//! (multi-tag snapshot). Each stage is stateless w.r.t. metrics — all
//! counters are reported to a [`metrics::QualityMetrics`] sink handed in
//! by the caller, per the design note in section 9 ("Replace with a
//! `MetricsSink` handed to each stage; components remain stateless w.r.t.
//! metrics").

pub mod calibrator;
pub mod interpolator;
pub mod metrics;
pub mod reasonableness;
pub mod threshold;

use crate::types::{QualityFlag, Sample};

#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    #[error("missing threshold configuration for tag {0}")]
    MissingThresholdConfig(String),
}

/// Runs the per-sample stages (threshold + calibration) on one sample,
/// recording outcomes to `metrics`. Interpolation and reasonableness are
/// series/snapshot-level and are invoked separately by the caller (the
/// buffer writer's producer loop) once enough context is available.
pub struct QualityPipeline {
    pub thresholds: threshold::ThresholdValidator,
    pub calibrations: calibrator::Calibrator,
}

impl QualityPipeline {
    pub fn new(thresholds: threshold::ThresholdValidator, calibrations: calibrator::Calibrator) -> Self {
        Self { thresholds, calibrations }
    }

    /// Validate then calibrate one sample, recording results into
    /// `metrics`. Returns the (possibly mutated) sample; validation
    /// failures set `quality_flag = Rejected` rather than dropping the
    /// sample outright, so the caller can still account for it.
    pub fn process(&self, mut sample: Sample, metrics: &metrics::QualityMetrics) -> Sample {
        if let Some(tag) = sample.tag_name().map(str::to_string) {
            if let Some(value) = sample.value() {
                let (valid, reason) = self.thresholds.validate(&tag, value);
                metrics.record_validation(&tag, valid);
                if !valid {
                    sample.set_quality_flag(QualityFlag::Rejected);
                    tracing::debug!(tag = %tag, value, reason, "sample rejected by threshold validator");
                    return sample;
                }
            }
            if let Some(calibrated) = self.calibrations.apply(&tag, &sample) {
                sample = calibrated;
                metrics.record_calibration(&tag);
            }
        }
        sample
    }
}
