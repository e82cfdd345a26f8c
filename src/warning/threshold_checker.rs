//! Phase 1 — threshold check (section 4.7).

use uuid::Uuid;

use crate::types::{ThresholdType, Timestamp, WarningEvent, WarningLevel, WarningThreshold, WarningType};

use super::evaluate_tier;

/// Evaluates one indicator's current value against its threshold
/// configuration, producing a single `threshold` warning carrying the
/// violated bound and type, or `None` if no tier was crossed.
pub fn check(
    indicator_name: &str,
    value: f64,
    threshold: &WarningThreshold,
    ring_number: u64,
    now: Timestamp,
) -> Option<WarningEvent> {
    let (level, bound, bound_type) = evaluate_tier(value, threshold)?;
    Some(build_event(indicator_name, value, bound, bound_type, level, threshold, ring_number, now))
}

pub fn build_event(
    indicator_name: &str,
    value: f64,
    bound: f64,
    bound_type: ThresholdType,
    level: WarningLevel,
    threshold: &WarningThreshold,
    ring_number: u64,
    now: Timestamp,
) -> WarningEvent {
    let channels = match level {
        WarningLevel::Attention => threshold.channels.attention.clone(),
        WarningLevel::Warning => threshold.channels.warning.clone(),
        WarningLevel::Alarm => threshold.channels.alarm.clone(),
    };
    WarningEvent {
        warning_id: Uuid::new_v4(),
        warning_type: WarningType::Threshold,
        warning_level: level,
        ring_number,
        timestamp: now,
        indicator_name: indicator_name.to_string(),
        indicator_value: Some(value),
        threshold_value: Some(bound),
        threshold_type: Some(bound_type),
        rate_of_change: None,
        rate_multiplier: None,
        predicted_value: None,
        prediction_confidence: None,
        prediction_horizon_hours: None,
        combined_indicators: vec![],
        notification_channels: channels,
        status: crate::types::WarningStatus::Active,
        created_at: now,
        acknowledged_at: None,
        acknowledged_by: None,
        resolved_at: None,
        notes: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HysteresisParams, PredictiveParams, RateParams, SeverityBounds, TierChannels};

    fn threshold() -> WarningThreshold {
        WarningThreshold {
            indicator_name: "settlement_value".into(),
            geological_zone: "all".into(),
            attention: SeverityBounds { lower: None, upper: Some(20.0) },
            warning: SeverityBounds { lower: None, upper: Some(30.0) },
            alarm: SeverityBounds { lower: None, upper: Some(40.0) },
            rate: RateParams::default(),
            predictive: PredictiveParams::default(),
            hysteresis: HysteresisParams::default(),
            channels: TierChannels::default(),
        }
    }

    #[test]
    fn scenario_threshold_escalation() {
        let t = threshold();
        let cases = [(15.0, None), (20.0, Some(WarningLevel::Attention)), (25.0, Some(WarningLevel::Attention)), (35.0, Some(WarningLevel::Warning)), (45.0, Some(WarningLevel::Alarm))];
        for (value, expected) in cases {
            let got = check("settlement_value", value, &t, 1, 0.0).map(|e| e.warning_level);
            assert_eq!(got, expected, "value={value}");
        }
    }

    #[test]
    fn alarm_wins_over_warning_when_both_crossed() {
        let t = threshold();
        let event = check("settlement_value", 45.0, &t, 1, 0.0).unwrap();
        assert_eq!(event.warning_level, WarningLevel::Alarm);
        assert_eq!(event.threshold_value, Some(40.0));
    }
}
