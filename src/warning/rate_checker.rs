//! Phase 2 — rate check (section 4.7).
//!
//! Queries the last `window_size + 1` historical ring values (inclusive
//! of current), computes per-ring deltas, takes the historical mean
//! rate, then compares `|current_rate|` to `|historical_mean|`. Requires
//! at least 2 historical data points and a non-trivial
//! `|historical_mean| > 1e-9` — a near-zero historical baseline would
//! make every ring a runaway multiple.

use uuid::Uuid;

use crate::types::{Timestamp, WarningEvent, WarningLevel, WarningThreshold, WarningType};

const MIN_HISTORICAL_POINTS: usize = 2;
const NONTRIVIAL_RATE_FLOOR: f64 = 1e-9;

/// `current_value` is the value for the ring under evaluation;
/// `historical_values` are its `window_size` immediate predecessors, in
/// ascending ring order (current excluded).
pub fn check(
    indicator_name: &str,
    current_value: f64,
    historical_values: &[f64],
    threshold: &WarningThreshold,
    ring_number: u64,
    now: Timestamp,
) -> Option<WarningEvent> {
    if historical_values.len() < MIN_HISTORICAL_POINTS {
        return None;
    }

    let mut series = historical_values.to_vec();
    series.push(current_value);

    let deltas: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let current_rate = *deltas.last()?;
    let historical_deltas = &deltas[..deltas.len() - 1];
    let historical_mean = historical_deltas.iter().sum::<f64>() / historical_deltas.len() as f64;

    if historical_mean.abs() <= NONTRIVIAL_RATE_FLOOR {
        return None;
    }

    let multiplier = current_rate.abs() / historical_mean.abs();
    let rate = &threshold.rate;
    let level = if multiplier >= rate.alarm_multiplier {
        WarningLevel::Alarm
    } else if multiplier >= rate.warning_multiplier {
        WarningLevel::Warning
    } else if multiplier >= rate.attention_multiplier {
        WarningLevel::Attention
    } else {
        return None;
    };

    let channels = match level {
        WarningLevel::Attention => threshold.channels.attention.clone(),
        WarningLevel::Warning => threshold.channels.warning.clone(),
        WarningLevel::Alarm => threshold.channels.alarm.clone(),
    };

    Some(WarningEvent {
        warning_id: Uuid::new_v4(),
        warning_type: WarningType::Rate,
        warning_level: level,
        ring_number,
        timestamp: now,
        indicator_name: indicator_name.to_string(),
        indicator_value: Some(current_value),
        threshold_value: Some(historical_mean),
        threshold_type: None,
        rate_of_change: Some(current_rate),
        rate_multiplier: Some(multiplier),
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
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HysteresisParams, PredictiveParams, RateParams, SeverityBounds, TierChannels};

    fn threshold() -> WarningThreshold {
        WarningThreshold {
            indicator_name: "settlement_value".into(),
            geological_zone: "all".into(),
            attention: SeverityBounds { lower: None, upper: None },
            warning: SeverityBounds { lower: None, upper: None },
            alarm: SeverityBounds { lower: None, upper: None },
            rate: RateParams::default(),
            predictive: PredictiveParams::default(),
            hysteresis: HysteresisParams::default(),
            channels: TierChannels::default(),
        }
    }

    #[test]
    fn scenario_rate_alarm() {
        // historical deltas averaging 0.1mm/ring over 10 rings (11 points),
        // then a new ring whose delta is +5.0mm => ALARM, multiplier ~= 50.
        let mut historical = vec![0.0];
        for i in 1..11 {
            historical.push(historical[i - 1] + 0.1);
        }
        let current = *historical.last().unwrap() + 5.0;
        let event = check("settlement_value", current, &historical, &threshold(), 42, 0.0).unwrap();
        assert_eq!(event.warning_level, WarningLevel::Alarm);
        assert!((event.rate_multiplier.unwrap() - 50.0).abs() < 1.0);
    }

    #[test]
    fn requires_at_least_two_historical_points() {
        let event = check("settlement_value", 10.0, &[1.0], &threshold(), 1, 0.0);
        assert!(event.is_none());
    }

    #[test]
    fn trivial_historical_mean_suppresses_check() {
        // historical mean rate ~= 0 (flat series) should not explode into an alarm.
        let historical = vec![10.0, 10.0, 10.0, 10.0];
        let event = check("settlement_value", 10.0001, &historical, &threshold(), 1, 0.0);
        assert!(event.is_none());
    }
}
