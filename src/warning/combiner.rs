//! Phase 5 — combined warning aggregation (section 4.7).
//!
//! Examines all post-hysteresis warnings for one ring and, when the
//! pattern matches, emits one additional `combined` warning:
//!
//! - >= 2 `ALARM` simultaneously => combined `ALARM`.
//! - settlement + any tunneling parameter (thrust/torque/chamber
//!   pressure) both firing, with >= 1 `ALARM` or >= 2 `WARNING` among
//!   them => combined `ALARM`.
//! - >= 3 `WARNING` simultaneously => combined `WARNING`.
//!
//! The combined event lists its source indicator names and inherits
//! notification channels from the most severe source.

use uuid::Uuid;

use crate::types::{Timestamp, WarningEvent, WarningLevel, WarningType};

/// Indicator names treated as "tunneling parameters" for the
/// settlement-plus-tunneling-parameter rule.
const TUNNELING_PARAMETER_INDICATORS: &[&str] = &["mean_thrust", "mean_torque", "chamber_pressure", "torque_thrust_ratio"];

pub fn combine(warnings: &[WarningEvent], ring_number: u64, now: Timestamp) -> Option<WarningEvent> {
    let alarms: Vec<&WarningEvent> = warnings.iter().filter(|w| w.warning_level == WarningLevel::Alarm).collect();
    let warns: Vec<&WarningEvent> = warnings.iter().filter(|w| w.warning_level == WarningLevel::Warning).collect();

    let settlement_fired = warnings.iter().any(|w| w.indicator_name == "settlement_value");
    let tunneling_fired: Vec<&WarningEvent> = warnings
        .iter()
        .filter(|w| TUNNELING_PARAMETER_INDICATORS.contains(&w.indicator_name.as_str()))
        .collect();

    let level = if alarms.len() >= 2 {
        WarningLevel::Alarm
    } else if settlement_fired
        && !tunneling_fired.is_empty()
        && (alarms.len() >= 1 || warns.len() >= 2)
    {
        WarningLevel::Alarm
    } else if warns.len() >= 3 {
        WarningLevel::Warning
    } else {
        return None;
    };

    let sources: Vec<&WarningEvent> = match level {
        WarningLevel::Alarm if alarms.len() >= 2 => alarms.clone(),
        WarningLevel::Alarm => {
            let mut v: Vec<&WarningEvent> = warnings
                .iter()
                .filter(|w| w.indicator_name == "settlement_value" || TUNNELING_PARAMETER_INDICATORS.contains(&w.indicator_name.as_str()))
                .collect();
            v.sort_by(|a, b| b.warning_level.cmp(&a.warning_level));
            v
        }
        _ => warns.clone(),
    };

    let combined_indicators: Vec<String> = sources.iter().map(|w| w.indicator_name.clone()).collect();
    let most_severe = sources.iter().max_by_key(|w| w.warning_level)?;
    let channels = most_severe.notification_channels.clone();

    Some(WarningEvent {
        warning_id: Uuid::new_v4(),
        warning_type: WarningType::Combined,
        warning_level: level,
        ring_number,
        timestamp: now,
        indicator_name: "combined".to_string(),
        indicator_value: None,
        threshold_value: None,
        threshold_type: None,
        rate_of_change: None,
        rate_multiplier: None,
        predicted_value: None,
        prediction_confidence: None,
        prediction_horizon_hours: None,
        combined_indicators,
        notification_channels: channels,
        status: crate::types::WarningStatus::Active,
        created_at: now,
        acknowledged_at: None,
        acknowledged_by: None,
        resolved_at: None,
        notes: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ThresholdType;

    fn warning(indicator: &str, level: WarningLevel) -> WarningEvent {
        WarningEvent {
            warning_id: Uuid::new_v4(),
            warning_type: WarningType::Threshold,
            warning_level: level,
            ring_number: 1,
            timestamp: 0.0,
            indicator_name: indicator.to_string(),
            indicator_value: Some(0.0),
            threshold_value: Some(0.0),
            threshold_type: Some(ThresholdType::Upper),
            rate_of_change: None,
            rate_multiplier: None,
            predicted_value: None,
            prediction_confidence: None,
            prediction_horizon_hours: None,
            combined_indicators: vec![],
            notification_channels: vec!["ops@example.com".to_string()],
            status: crate::types::WarningStatus::Active,
            created_at: 0.0,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            notes: None,
        }
    }

    #[test]
    fn scenario_combined_alarm() {
        let warnings = vec![
            warning("settlement_value", WarningLevel::Alarm),
            warning("mean_thrust", WarningLevel::Alarm),
        ];
        let combined = combine(&warnings, 1, 0.0).unwrap();
        assert_eq!(combined.warning_type, WarningType::Combined);
        assert_eq!(combined.warning_level, WarningLevel::Alarm);
        assert_eq!(combined.combined_indicators.len(), 2);
        assert!(combined.combined_indicators.contains(&"settlement_value".to_string()));
        assert!(combined.combined_indicators.contains(&"mean_thrust".to_string()));
    }

    #[test]
    fn three_warnings_produce_combined_warning() {
        let warnings = vec![
            warning("pitch", WarningLevel::Warning),
            warning("roll", WarningLevel::Warning),
            warning("yaw", WarningLevel::Warning),
        ];
        let combined = combine(&warnings, 1, 0.0).unwrap();
        assert_eq!(combined.warning_level, WarningLevel::Warning);
    }

    #[test]
    fn settlement_plus_tunneling_two_warnings_escalates_to_alarm() {
        let warnings = vec![
            warning("settlement_value", WarningLevel::Warning),
            warning("mean_torque", WarningLevel::Warning),
        ];
        let combined = combine(&warnings, 1, 0.0).unwrap();
        assert_eq!(combined.warning_level, WarningLevel::Alarm);
    }

    #[test]
    fn below_thresholds_yields_no_combined_warning() {
        let warnings = vec![warning("pitch", WarningLevel::Attention), warning("roll", WarningLevel::Warning)];
        assert!(combine(&warnings, 1, 0.0).is_none());
    }
}
