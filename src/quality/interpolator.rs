//! Interpolator (section 4.2): series-level gap filling. Given a
//! time-ordered series for one tag and an expected sampling interval `Δ`,
//! detects gaps where `t[i+1] - t[i] > Δ + tolerance`. Gaps `<=
//! max_gap_seconds` are filled with linearly interpolated points at `Δ`
//! spacing, flagged `interpolated`. Gaps exceeding the limit mark the
//! trailing sample `missing` and leave the gap unfilled. Interpolation
//! never crosses a `rejected` boundary.

use crate::config::defaults;
use crate::types::{Payload, QualityFlag, Sample};

#[derive(Debug, Clone, Copy)]
pub struct InterpolatorConfig {
    pub expected_interval_seconds: f64,
    pub gap_tolerance_seconds: f64,
    pub max_gap_seconds: f64,
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            expected_interval_seconds: defaults::DEFAULT_SAMPLE_INTERVAL_SECONDS,
            gap_tolerance_seconds: defaults::GAP_DETECTION_TOLERANCE_SECONDS,
            max_gap_seconds: defaults::DEFAULT_MAX_GAP_SECONDS,
        }
    }
}

/// Fills gaps in a chronologically-sorted series of same-tag PLC samples.
/// Samples must already be in ascending-timestamp order; the caller (the
/// buffer writer's per-tag producer loop) owns ordering.
pub fn interpolate_series(series: &[Sample], config: &InterpolatorConfig) -> Vec<Sample> {
    if series.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(series.len());
    out.push(series[0].clone());

    for window in series.windows(2) {
        let prev = &window[0];
        let next = &window[1];
        let gap = next.timestamp - prev.timestamp;
        let threshold = config.expected_interval_seconds + config.gap_tolerance_seconds;

        if gap <= threshold || prev.quality_flag == QualityFlag::Rejected {
            out.push(next.clone());
            continue;
        }

        if gap > config.max_gap_seconds {
            let mut missing = next.clone();
            missing.set_quality_flag(QualityFlag::Missing);
            out.push(missing);
            continue;
        }

        let Some(prev_value) = prev.value() else {
            out.push(next.clone());
            continue;
        };
        let Some(next_value) = next.value() else {
            out.push(next.clone());
            continue;
        };

        let mut t = prev.timestamp + config.expected_interval_seconds;
        while t < next.timestamp {
            let fraction = (t - prev.timestamp) / gap;
            let value = prev_value + (next_value - prev_value) * fraction;
            let payload = match &prev.payload {
                Payload::Plc { tag_name, .. } => Payload::Plc { tag_name: tag_name.clone(), value },
                Payload::Monitoring { sensor_type, sensor_location, unit, .. } => Payload::Monitoring {
                    sensor_type: sensor_type.clone(),
                    sensor_location: sensor_location.clone(),
                    value,
                    unit: unit.clone(),
                },
                attitude @ Payload::Attitude { .. } => attitude.clone(),
            };
            let mut interpolated = Sample::new(prev.source_id.clone(), t, payload);
            interpolated.set_quality_flag(QualityFlag::Interpolated);
            out.push(interpolated);
            t += config.expected_interval_seconds;
        }
        out.push(next.clone());
    }

    out
}
