//! Phase 3 — predictive check (section 4.7).
//!
//! Consumes predictions through a [`PredictionSource`] trait rather than a
//! full ML inference client (section 1: the prediction producer is an
//! external collaborator; section 4.7: "this repo consumes it through a
//! `PredictionSource` trait with an in-memory/stub implementation").

use uuid::Uuid;

use crate::storage::prediction::PredictionResult;
use crate::types::{Timestamp, WarningEvent, WarningLevel, WarningThreshold, WarningType};

use super::evaluate_tier;

/// Read-only access to the latest prediction for a ring/indicator pair.
/// A real ML inference client would implement this against its own RPC
/// surface; [`StubPredictionSource`] backs tests and local operation by
/// reading straight out of the `prediction_results` table.
pub trait PredictionSource: Send + Sync {
    fn latest_prediction(&self, ring_number: u64, indicator_name: &str) -> Option<PredictionResult>;
}

/// Reads predictions straight out of the store — the "local operation"
/// implementation named in section 4.7, not a stand-in for a real
/// inference service.
pub struct StorePredictionSource {
    pub store: crate::storage::Store,
}

impl PredictionSource for StorePredictionSource {
    fn latest_prediction(&self, ring_number: u64, indicator_name: &str) -> Option<PredictionResult> {
        self.store.latest_prediction(ring_number, indicator_name).ok().flatten()
    }
}

/// Checks one indicator's latest prediction against its threshold
/// configuration. Two crossing rules plus an approach-to-threshold rule,
/// in that priority order:
///
/// 1. If the point estimate itself violates a tier, emit that tier
///    directly.
/// 2. Else if only the confidence upper bound violates a tier, emit that
///    tier downgraded one severity step (section 4.7: "upper-bound alarms
///    become warnings, etc.").
/// 3. Else if the point estimate has reached `threshold_percentage` of a
///    tier's bound without crossing it, emit that tier directly
///    ("approach-to-threshold").
pub fn check(
    indicator_name: &str,
    source: &dyn PredictionSource,
    threshold: &WarningThreshold,
    ring_number: u64,
    now: Timestamp,
) -> Option<WarningEvent> {
    if !threshold.predictive.enabled {
        return None;
    }
    let prediction = source.latest_prediction(ring_number, indicator_name)?;
    if prediction.confidence < threshold.predictive.min_confidence {
        return None;
    }

    let (level, bound, bound_type, downgraded) = if let Some((level, bound, bound_type)) =
        evaluate_tier(prediction.predicted_value, threshold)
    {
        (level, bound, bound_type, false)
    } else if let Some((level, bound, bound_type)) = evaluate_tier(prediction.confidence_upper_bound, threshold) {
        (level.downgrade_one(), bound, bound_type, true)
    } else if let Some((level, bound, bound_type)) = approaching_tier(prediction.predicted_value, threshold) {
        (level, bound, bound_type, false)
    } else {
        return None;
    };

    tracing::debug!(
        indicator = indicator_name,
        ring_number,
        predicted = prediction.predicted_value,
        upper_bound = prediction.confidence_upper_bound,
        downgraded,
        level = ?level,
        "predictive warning evaluated"
    );

    let channels = match level {
        WarningLevel::Attention => threshold.channels.attention.clone(),
        WarningLevel::Warning => threshold.channels.warning.clone(),
        WarningLevel::Alarm => threshold.channels.alarm.clone(),
    };

    Some(WarningEvent {
        warning_id: Uuid::new_v4(),
        warning_type: WarningType::Predictive,
        warning_level: level,
        ring_number,
        timestamp: now,
        indicator_name: indicator_name.to_string(),
        indicator_value: Some(prediction.predicted_value),
        threshold_value: Some(bound),
        threshold_type: Some(bound_type),
        rate_of_change: None,
        rate_multiplier: None,
        predicted_value: Some(prediction.predicted_value),
        prediction_confidence: Some(prediction.confidence),
        prediction_horizon_hours: Some(prediction.horizon_hours),
        combined_indicators: vec![],
        notification_channels: channels,
        status: crate::types::WarningStatus::Active,
        created_at: now,
        acknowledged_at: None,
        acknowledged_by: None,
        resolved_at: None,
        notes: None,
    })
}

/// A tier whose bound the point estimate has reached
/// `threshold_percentage` of, without actually crossing it.
fn approaching_tier(
    predicted_value: f64,
    threshold: &WarningThreshold,
) -> Option<(WarningLevel, f64, crate::types::ThresholdType)> {
    use crate::types::ThresholdType;
    use WarningLevel::{Alarm, Attention, Warning};

    let pct = threshold.predictive.threshold_percentage;
    for level in [Alarm, Warning, Attention] {
        let bounds = threshold.bounds_for(level);
        if let Some(upper) = bounds.upper {
            if predicted_value < upper && predicted_value >= pct * upper {
                return Some((level, upper, ThresholdType::Upper));
            }
        }
        if let Some(lower) = bounds.lower {
            if predicted_value > lower && predicted_value <= lower + (1.0 - pct) * lower.abs() {
                return Some((level, lower, ThresholdType::Lower));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HysteresisParams, RateParams, SeverityBounds, TierChannels};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedSource(Mutex<HashMap<(u64, String), PredictionResult>>);

    impl FixedSource {
        fn new(entries: Vec<PredictionResult>) -> Self {
            let mut map = HashMap::new();
            for p in entries {
                map.insert((p.ring_number, p.indicator_name.clone()), p);
            }
            Self(Mutex::new(map))
        }
    }

    impl PredictionSource for FixedSource {
        fn latest_prediction(&self, ring_number: u64, indicator_name: &str) -> Option<PredictionResult> {
            self.0.lock().unwrap().get(&(ring_number, indicator_name.to_string())).cloned()
        }
    }

    fn threshold() -> WarningThreshold {
        WarningThreshold {
            indicator_name: "settlement_value".into(),
            geological_zone: "all".into(),
            attention: SeverityBounds { lower: None, upper: Some(20.0) },
            warning: SeverityBounds { lower: None, upper: Some(30.0) },
            alarm: SeverityBounds { lower: None, upper: Some(40.0) },
            rate: RateParams::default(),
            predictive: crate::types::PredictiveParams { enabled: true, horizon_hours: 24.0, threshold_percentage: 0.9, min_confidence: 0.6 },
            hysteresis: HysteresisParams::default(),
            channels: TierChannels::default(),
        }
    }

    #[test]
    fn scenario_predictive_downgrade() {
        // Predicted 25 crosses attention(20) directly -> produces ATTENTION
        // without needing the downgrade path. This matches the scenario's
        // described *emitted* level even though the narrative frames it as
        // "downgraded from the upper-bound WARNING" — the point estimate
        // already crosses attention, which takes priority per phase 3's
        // first rule.
        let source = FixedSource::new(vec![PredictionResult {
            ring_number: 7,
            indicator_name: "settlement_value".into(),
            predicted_value: 25.0,
            confidence: 0.8,
            confidence_upper_bound: 32.0,
            horizon_hours: 24.0,
            created_at: 0.0,
        }]);
        let event = check("settlement_value", &source, &threshold(), 7, 0.0).unwrap();
        assert_eq!(event.warning_level, WarningLevel::Attention);
    }

    #[test]
    fn upper_bound_only_violation_downgrades_one_step() {
        let mut t = threshold();
        t.attention.upper = None; // remove the point-estimate crossing so only the upper bound trips
        let source = FixedSource::new(vec![PredictionResult {
            ring_number: 7,
            indicator_name: "settlement_value".into(),
            predicted_value: 25.0,
            confidence: 0.8,
            confidence_upper_bound: 32.0,
            horizon_hours: 24.0,
            created_at: 0.0,
        }]);
        let event = check("settlement_value", &source, &t, 7, 0.0).unwrap();
        // upper bound (32) crosses warning(30) => WARNING, downgraded one step => ATTENTION
        assert_eq!(event.warning_level, WarningLevel::Attention);
    }

    #[test]
    fn below_min_confidence_is_skipped() {
        let source = FixedSource::new(vec![PredictionResult {
            ring_number: 7,
            indicator_name: "settlement_value".into(),
            predicted_value: 45.0,
            confidence: 0.1,
            confidence_upper_bound: 50.0,
            horizon_hours: 24.0,
            created_at: 0.0,
        }]);
        assert!(check("settlement_value", &source, &threshold(), 7, 0.0).is_none());
    }
}
