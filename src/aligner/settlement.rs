//! Settlement associator (section 4.5): queries monitoring readings in a
//! time-lagged window after ring completion and aggregates them.
//! Supports per-sensor-type lag overrides (supplemented feature, SPEC_FULL
//! 2b) in addition to the single default lag window.

use std::collections::HashMap;

use crate::config::defaults::{DEFAULT_SETTLEMENT_LAG_MAX_HOURS, DEFAULT_SETTLEMENT_LAG_MIN_HOURS};
use crate::types::{Payload, Sample, SettlementFeatures, Timestamp};

const HOUR_SECONDS: f64 = 3600.0;

#[derive(Debug, Clone)]
pub struct LagWindow {
    pub min_hours: f64,
    pub max_hours: f64,
}

impl Default for LagWindow {
    fn default() -> Self {
        Self { min_hours: DEFAULT_SETTLEMENT_LAG_MIN_HOURS, max_hours: DEFAULT_SETTLEMENT_LAG_MAX_HOURS }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettlementAssociatorConfig {
    pub default_lag: LagWindow,
    pub per_sensor_type_lag: HashMap<String, LagWindow>,
    pub sensor_locations: Option<Vec<String>>,
    pub primary_sensor_type: String,
}

impl SettlementAssociatorConfig {
    fn lag_for(&self, sensor_type: &str) -> &LagWindow {
        self.per_sensor_type_lag.get(sensor_type).unwrap_or(&self.default_lag)
    }
}

/// Filters `all_monitoring_samples` (already fetched for a superset
/// window by the caller) down to the lag window for each sample's sensor
/// type, then aggregates values from the configured primary sensor type
/// (or all types if unset) into [`SettlementFeatures`]. `sensor_count` is
/// the number of distinct `sensor_location`s among the matched readings,
/// not the number of distinct sensor types.
pub fn associate(
    all_monitoring_samples: &[Sample],
    ring_end_time: Timestamp,
    config: &SettlementAssociatorConfig,
) -> SettlementFeatures {
    let mut matched = Vec::new();
    let mut sensor_locations_seen: std::collections::HashSet<String> = std::collections::HashSet::new();

    for sample in all_monitoring_samples {
        let Payload::Monitoring { sensor_type, sensor_location, value, .. } = &sample.payload else {
            continue;
        };
        if let Some(locations) = &config.sensor_locations {
            match sensor_location {
                Some(loc) if locations.contains(loc) => {}
                _ => continue,
            }
        }
        if !config.primary_sensor_type.is_empty() && sensor_type != &config.primary_sensor_type {
            continue;
        }
        let lag = config.lag_for(sensor_type);
        let elapsed_hours = (sample.timestamp - ring_end_time) / HOUR_SECONDS;
        if elapsed_hours >= lag.min_hours && elapsed_hours <= lag.max_hours {
            matched.push(*value);
            if let Some(loc) = sensor_location {
                sensor_locations_seen.insert(loc.clone());
            }
        }
    }

    if matched.is_empty() {
        return SettlementFeatures::default();
    }

    let n = matched.len() as f64;
    let mean = matched.iter().sum::<f64>() / n;
    let min = matched.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = matched.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let variance = matched.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let mut sorted = matched.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = {
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] }
    };

    SettlementFeatures {
        settlement_value: Some(mean),
        min: Some(min),
        max: Some(max),
        std: Some(variance.sqrt()),
        median: Some(median),
        sensor_count: sensor_locations_seen.len(),
        reading_count: matched.len(),
    }
}

/// Settlement time-series accessor for trend display (supplemented
/// feature, SPEC_FULL 2b): `(timestamp, value)` pairs in range, for the
/// primary sensor type, chronologically sorted.
pub fn time_series(all_monitoring_samples: &[Sample], primary_sensor_type: &str) -> Vec<(Timestamp, f64)> {
    let mut out: Vec<(Timestamp, f64)> = all_monitoring_samples
        .iter()
        .filter_map(|s| match &s.payload {
            Payload::Monitoring { sensor_type, value, .. } if sensor_type == primary_sensor_type => {
                Some((s.timestamp, *value))
            }
            _ => None,
        })
        .collect();
    out.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitoring_sample(ts: f64, sensor_type: &str, location: Option<&str>, value: f64) -> Sample {
        Sample::new(
            "monitoring-1",
            ts,
            Payload::Monitoring {
                sensor_type: sensor_type.to_string(),
                sensor_location: location.map(str::to_string),
                value,
                unit: "mm".to_string(),
            },
        )
    }

    #[test]
    fn aggregates_within_default_lag_window() {
        let config = SettlementAssociatorConfig { primary_sensor_type: "settlement".to_string(), ..Default::default() };
        let ring_end = 0.0;
        let samples = vec![
            monitoring_sample(6.5 * 3600.0, "settlement", None, 10.0),
            monitoring_sample(7.0 * 3600.0, "settlement", None, 20.0),
            monitoring_sample(20.0 * 3600.0, "settlement", None, 999.0), // outside window
        ];
        let features = associate(&samples, ring_end, &config);
        assert_eq!(features.reading_count, 2);
        assert!((features.settlement_value.unwrap() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn per_sensor_type_lag_override_applies() {
        let mut per_type = HashMap::new();
        per_type.insert("tilt".to_string(), LagWindow { min_hours: 0.0, max_hours: 1.0 });
        let config = SettlementAssociatorConfig { per_sensor_type_lag: per_type, primary_sensor_type: "tilt".to_string(), ..Default::default() };
        let samples = vec![monitoring_sample(0.5 * 3600.0, "tilt", None, 3.0)];
        let features = associate(&samples, 0.0, &config);
        assert_eq!(features.reading_count, 1);
    }

    #[test]
    fn filters_by_sensor_location() {
        let config = SettlementAssociatorConfig {
            primary_sensor_type: "settlement".to_string(),
            sensor_locations: Some(vec!["north".to_string()]),
            ..Default::default()
        };
        let samples = vec![
            monitoring_sample(7.0 * 3600.0, "settlement", Some("north"), 5.0),
            monitoring_sample(7.0 * 3600.0, "settlement", Some("south"), 50.0),
        ];
        let features = associate(&samples, 0.0, &config);
        assert_eq!(features.reading_count, 1);
        assert_eq!(features.settlement_value, Some(5.0));
    }

    #[test]
    fn sensor_count_reflects_distinct_locations_not_types() {
        let config = SettlementAssociatorConfig { primary_sensor_type: "settlement".to_string(), ..Default::default() };
        let samples = vec![
            monitoring_sample(7.0 * 3600.0, "settlement", Some("north"), 5.0),
            monitoring_sample(7.0 * 3600.0, "settlement", Some("south"), 6.0),
            monitoring_sample(7.0 * 3600.0, "settlement", Some("north"), 7.0),
        ];
        let features = associate(&samples, 0.0, &config);
        assert_eq!(features.reading_count, 3);
        assert_eq!(features.sensor_count, 2);
    }
}
