//! Phase 4 — hysteresis filtering (section 4.7).
//!
//! State is keyed by `(indicator, zone)` and exclusively owned by the
//! warning engine (section 3: "the warning engine exclusively owns
//! per-indicator hysteresis state"). Rules: first warning for a key
//! always passes; escalation and de-escalation always pass; a
//! same-severity repeat passes only when the value has moved at least
//! `hysteresis_percentage` of the last threshold.
//!
//! Per section 9's resolved open question, `indicators` is a mandatory
//! argument to [`sweep_cleanup`] rather than an optional one — the
//! source's ambiguity ("if the warning engine is invoked without them the
//! state will persist indefinitely") is closed by making the cleanup
//! sweep's caller always supply current values.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::{Timestamp, WarningLevel, WarningThreshold};

#[derive(Debug, Clone)]
struct HysteresisState {
    last_level: WarningLevel,
    last_value: f64,
    last_threshold: f64,
    timestamp: Timestamp,
}

/// `(indicator_name, geological_zone)` state table, serialized per key
/// (section 5: "hysteresis state updates are serialized per (indicator,
/// zone) key").
#[derive(Default)]
pub struct HysteresisTable {
    state: Mutex<HashMap<(String, String), HysteresisState>>,
}

impl HysteresisTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether a same-indicator warning should pass the
    /// hysteresis filter, updating state as a side effect when it does.
    pub fn filter(
        &self,
        indicator_name: &str,
        zone: &str,
        level: WarningLevel,
        value: f64,
        threshold_value: f64,
        now: Timestamp,
        percentage: f64,
    ) -> bool {
        let key = (indicator_name.to_string(), zone.to_string());
        let mut state = self.state.lock().expect("hysteresis table lock poisoned");

        let pass = match state.get(&key) {
            None => true,
            Some(prev) if level > prev.last_level => true,
            Some(prev) if level < prev.last_level => true,
            Some(prev) => {
                let denom = prev.last_threshold.abs();
                if denom <= f64::EPSILON {
                    true
                } else {
                    (value - prev.last_value).abs() / denom >= percentage
                }
            }
        };

        if pass {
            state.insert(
                key,
                HysteresisState { last_level: level, last_value: value, last_threshold: threshold_value, timestamp: now },
            );
        }
        pass
    }

    /// Cleanup sweep (section 4.7 phase 4): for each state key not
    /// represented in `active_keys` this round, drop it only when
    /// `indicators` supplies a current value that is within normal range
    /// per its threshold config. Keys with no current value, or whose
    /// current value still violates a tier without having produced a
    /// warning (e.g. a checker failure upstream), are kept.
    pub fn sweep_cleanup(
        &self,
        active_keys: &[(String, String)],
        indicators: &HashMap<String, f64>,
        thresholds: &HashMap<(String, String), WarningThreshold>,
    ) {
        let mut state = self.state.lock().expect("hysteresis table lock poisoned");
        let active: std::collections::HashSet<_> = active_keys.iter().cloned().collect();

        let stale: Vec<(String, String)> = state
            .keys()
            .filter(|key| !active.contains(*key))
            .cloned()
            .collect();

        for key in stale {
            let Some(value) = indicators.get(&key.0) else {
                continue;
            };
            let Some(threshold) = thresholds.get(&key) else {
                continue;
            };
            if super::evaluate_tier(*value, threshold).is_none() {
                state.remove(&key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("hysteresis table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_warning_always_passes() {
        let table = HysteresisTable::new();
        assert!(table.filter("settlement_value", "all", WarningLevel::Attention, 25.0, 20.0, 0.0, 0.05));
    }

    #[test]
    fn same_severity_suppressed_below_move_threshold() {
        let table = HysteresisTable::new();
        assert!(table.filter("settlement_value", "all", WarningLevel::Warning, 35.0, 30.0, 0.0, 0.05));
        // same level, value moved by 1.0 / 30.0 ~= 3.3% < 5%
        assert!(!table.filter("settlement_value", "all", WarningLevel::Warning, 36.0, 30.0, 10.0, 0.05));
    }

    #[test]
    fn same_severity_passes_above_move_threshold() {
        let table = HysteresisTable::new();
        assert!(table.filter("settlement_value", "all", WarningLevel::Warning, 35.0, 30.0, 0.0, 0.05));
        // moved by 2.0 / 30.0 ~= 6.7% >= 5%
        assert!(table.filter("settlement_value", "all", WarningLevel::Warning, 37.0, 30.0, 10.0, 0.05));
    }

    #[test]
    fn escalation_and_deescalation_always_pass() {
        let table = HysteresisTable::new();
        assert!(table.filter("settlement_value", "all", WarningLevel::Attention, 25.0, 20.0, 0.0, 0.05));
        assert!(table.filter("settlement_value", "all", WarningLevel::Alarm, 45.0, 40.0, 10.0, 0.05));
        assert!(table.filter("settlement_value", "all", WarningLevel::Attention, 26.0, 20.0, 20.0, 0.05));
    }

    #[test]
    fn cleanup_drops_key_only_when_value_in_normal_range() {
        use crate::types::{HysteresisParams, PredictiveParams, RateParams, SeverityBounds, TierChannels};
        let table = HysteresisTable::new();
        table.filter("settlement_value", "all", WarningLevel::Attention, 25.0, 20.0, 0.0, 0.05);

        let threshold = WarningThreshold {
            indicator_name: "settlement_value".into(),
            geological_zone: "all".into(),
            attention: SeverityBounds { lower: None, upper: Some(20.0) },
            warning: SeverityBounds { lower: None, upper: Some(30.0) },
            alarm: SeverityBounds { lower: None, upper: Some(40.0) },
            rate: RateParams::default(),
            predictive: PredictiveParams::default(),
            hysteresis: HysteresisParams::default(),
            channels: TierChannels::default(),
        };
        let mut thresholds = HashMap::new();
        thresholds.insert(("settlement_value".to_string(), "all".to_string()), threshold);

        // still violating -> kept
        let mut indicators = HashMap::new();
        indicators.insert("settlement_value".to_string(), 25.0);
        table.sweep_cleanup(&[], &indicators, &thresholds);
        assert_eq!(table.len(), 1);

        // back within normal range -> dropped
        indicators.insert("settlement_value".to_string(), 5.0);
        table.sweep_cleanup(&[], &indicators, &thresholds);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn cleanup_keeps_key_when_no_current_value_supplied() {
        let table = HysteresisTable::new();
        table.filter("settlement_value", "all", WarningLevel::Attention, 25.0, 20.0, 0.0, 0.05);
        table.sweep_cleanup(&[], &HashMap::new(), &HashMap::new());
        assert_eq!(table.len(), 1);
    }
}
