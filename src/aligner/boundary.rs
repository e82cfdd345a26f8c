//! Ring boundary detector (section 4.4): three methods attempted in
//! order with fallbacks. The selected boundary is validated (`end >
//! start`, `end <= now`, duration in `[10 min, 120 min]`); validation
//! failure records a counter and still returns the computed pair (the
//! aggregator may downgrade completeness).

use crate::config::geometry::AlignmentGeometry;
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryMethod {
    AdvanceSensor,
    RingAssemblySignal,
    TimeFallback,
}

impl BoundaryMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryMethod::AdvanceSensor => "advance_sensor",
            BoundaryMethod::RingAssemblySignal => "ring_assembly_signal",
            BoundaryMethod::TimeFallback => "time_fallback",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RingBoundary {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub method: BoundaryMethod,
    pub valid: bool,
}

/// One `(timestamp, cumulative_advance_value)` sample from the advance
/// sensor.
#[derive(Debug, Clone, Copy)]
pub struct AdvanceSample {
    pub timestamp: Timestamp,
    pub value_mm: f64,
}

/// Method 1: reads a cumulative advance signal within the search window;
/// emits a boundary at the first position where the advance since
/// `start_value` matches the configured ring width within tolerance. If
/// advance exceeds `width + tolerance` without matching, resets the
/// anchor (restarts the search from that later sample).
pub fn detect_advance_sensor(series: &[AdvanceSample], geometry: &AlignmentGeometry) -> Option<(Timestamp, Timestamp)> {
    if series.is_empty() {
        return None;
    }
    let mut anchor_idx = 0usize;
    for i in 1..series.len() {
        let advance = series[i].value_mm - series[anchor_idx].value_mm;
        let target = geometry.ring_width_mm;
        let tolerance = geometry.ring_width_tolerance_mm;

        if (advance - target).abs() <= tolerance {
            return Some((series[anchor_idx].timestamp, series[i].timestamp));
        }
        if advance > target + tolerance {
            anchor_idx = i;
        }
    }
    None
}

/// A `(timestamp, active)` sample of the binary "assembly active"
/// signal.
#[derive(Debug, Clone, Copy)]
pub struct AssemblySample {
    pub timestamp: Timestamp,
    pub active: bool,
}

/// Method 2: rising edge (0->1) as start, falling edge (1->0) as end.
pub fn detect_ring_assembly_signal(series: &[AssemblySample]) -> Option<(Timestamp, Timestamp)> {
    let mut start = None;
    for window in series.windows(2) {
        let (prev, next) = (window[0], window[1]);
        if !prev.active && next.active {
            start = Some(next.timestamp);
        } else if prev.active && !next.active {
            if let Some(s) = start {
                return Some((s, next.timestamp));
            }
        }
    }
    None
}

/// Method 3: `previous_ring_end + typical_duration`.
pub fn detect_time_fallback(previous_ring_end: Timestamp, geometry: &AlignmentGeometry) -> (Timestamp, Timestamp) {
    (previous_ring_end, previous_ring_end + geometry.typical_ring_duration_seconds)
}

/// Runs the three methods in order, falling back on failure, then
/// validates the winning boundary (section 4.4).
pub fn detect_boundary(
    advance_series: &[AdvanceSample],
    assembly_series: &[AssemblySample],
    previous_ring_end: Timestamp,
    now: Timestamp,
    geometry: &AlignmentGeometry,
) -> RingBoundary {
    let (start_time, end_time, method) = if let Some((s, e)) = detect_advance_sensor(advance_series, geometry) {
        (s, e, BoundaryMethod::AdvanceSensor)
    } else if let Some((s, e)) = detect_ring_assembly_signal(assembly_series) {
        (s, e, BoundaryMethod::RingAssemblySignal)
    } else {
        let (s, e) = detect_time_fallback(previous_ring_end, geometry);
        (s, e, BoundaryMethod::TimeFallback)
    };

    let duration = end_time - start_time;
    let valid = end_time > start_time
        && end_time <= now
        && duration >= geometry.min_ring_duration_seconds
        && duration <= geometry.max_ring_duration_seconds;

    if !valid {
        tracing::warn!(
            start_time,
            end_time,
            method = method.as_str(),
            duration,
            "ring boundary failed validation"
        );
    }

    RingBoundary { start_time, end_time, method, valid }
}
