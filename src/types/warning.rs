use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timestamp;

/// Severity tier. `Ord` is derived in declaration order so that
/// `WarningLevel::Alarm > WarningLevel::Warning > WarningLevel::Attention`,
/// matching "decreasing severity" evaluation order in section 4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WarningLevel {
    Attention,
    Warning,
    Alarm,
}

impl WarningLevel {
    /// One severity step down, floored at `Attention` (used by the
    /// predictive-check upper-bound downgrade rule, section 4.7 phase 3).
    pub fn downgrade_one(self) -> Self {
        match self {
            WarningLevel::Alarm => WarningLevel::Warning,
            WarningLevel::Warning => WarningLevel::Attention,
            WarningLevel::Attention => WarningLevel::Attention,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningType {
    Threshold,
    Rate,
    Predictive,
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdType {
    Lower,
    Upper,
    Range,
}

/// Lifecycle state of a [`WarningEvent`] (section 3): `active ->
/// acknowledged -> resolved` (terminal); `active -> false_positive`
/// (terminal); `resolved`/`false_positive` reject further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningStatus {
    Active,
    Acknowledged,
    Resolved,
    FalsePositive,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("warning is in terminal state {0:?} and cannot transition")]
    Terminal(WarningStatus),
    #[error("cannot transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: WarningStatus,
        to: WarningStatus,
    },
}

/// Durable, append-mostly warning event produced by the warning engine
/// (section 3, section 4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningEvent {
    pub warning_id: Uuid,
    pub warning_type: WarningType,
    pub warning_level: WarningLevel,
    pub ring_number: u64,
    pub timestamp: Timestamp,

    pub indicator_name: String,
    pub indicator_value: Option<f64>,
    pub threshold_value: Option<f64>,
    pub threshold_type: Option<ThresholdType>,

    pub rate_of_change: Option<f64>,
    pub rate_multiplier: Option<f64>,

    pub predicted_value: Option<f64>,
    pub prediction_confidence: Option<f64>,
    pub prediction_horizon_hours: Option<f64>,

    pub combined_indicators: Vec<String>,
    pub notification_channels: Vec<String>,

    pub status: WarningStatus,
    pub created_at: Timestamp,
    pub acknowledged_at: Option<Timestamp>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<Timestamp>,
    pub notes: Option<String>,
}

impl WarningEvent {
    pub fn acknowledge(&mut self, user_id: &str, notes: Option<String>, at: Timestamp) -> Result<(), LifecycleError> {
        match self.status {
            WarningStatus::Active => {
                self.status = WarningStatus::Acknowledged;
                self.acknowledged_at = Some(at);
                self.acknowledged_by = Some(user_id.to_string());
                if notes.is_some() {
                    self.notes = notes;
                }
                Ok(())
            }
            terminal @ (WarningStatus::Resolved | WarningStatus::FalsePositive) => {
                Err(LifecycleError::Terminal(terminal))
            }
            WarningStatus::Acknowledged => Err(LifecycleError::InvalidTransition {
                from: self.status,
                to: WarningStatus::Acknowledged,
            }),
        }
    }

    pub fn resolve(&mut self, mark_as_false_positive: bool, at: Timestamp) -> Result<(), LifecycleError> {
        match self.status {
            WarningStatus::Active | WarningStatus::Acknowledged => {
                self.status = if mark_as_false_positive {
                    WarningStatus::FalsePositive
                } else {
                    WarningStatus::Resolved
                };
                self.resolved_at = Some(at);
                Ok(())
            }
            terminal @ (WarningStatus::Resolved | WarningStatus::FalsePositive) => {
                Err(LifecycleError::Terminal(terminal))
            }
        }
    }
}

/// Durable configuration scoped by `(indicator_name, geological_zone)`,
/// with `zone = "all"` as wildcard (section 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityBounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateParams {
    pub window_size: usize,
    pub attention_multiplier: f64,
    pub warning_multiplier: f64,
    pub alarm_multiplier: f64,
}

impl Default for RateParams {
    fn default() -> Self {
        Self {
            window_size: 10,
            attention_multiplier: 2.0,
            warning_multiplier: 3.0,
            alarm_multiplier: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictiveParams {
    pub enabled: bool,
    pub horizon_hours: f64,
    pub threshold_percentage: f64,
    pub min_confidence: f64,
}

impl Default for PredictiveParams {
    fn default() -> Self {
        Self {
            enabled: true,
            horizon_hours: 24.0,
            threshold_percentage: 0.9,
            min_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HysteresisParams {
    pub percentage: f64,
    pub min_duration_seconds: f64,
}

impl Default for HysteresisParams {
    fn default() -> Self {
        Self {
            percentage: 0.05,
            min_duration_seconds: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierChannels {
    pub attention: Vec<String>,
    pub warning: Vec<String>,
    pub alarm: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningThreshold {
    pub indicator_name: String,
    pub geological_zone: String,
    pub attention: SeverityBounds,
    pub warning: SeverityBounds,
    pub alarm: SeverityBounds,
    pub rate: RateParams,
    pub predictive: PredictiveParams,
    pub hysteresis: HysteresisParams,
    pub channels: TierChannels,
}

impl WarningThreshold {
    pub fn key(indicator_name: &str, geological_zone: &str) -> String {
        format!("{indicator_name}_{geological_zone}")
    }

    pub fn scope_key(&self) -> String {
        Self::key(&self.indicator_name, &self.geological_zone)
    }

    /// Bounds for the given tier, in decreasing-severity evaluation order
    /// when paired with [`WarningLevel::Alarm`]/`Warning`/`Attention`.
    pub fn bounds_for(&self, level: WarningLevel) -> &SeverityBounds {
        match level {
            WarningLevel::Alarm => &self.alarm,
            WarningLevel::Warning => &self.warning,
            WarningLevel::Attention => &self.attention,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> WarningEvent {
        WarningEvent {
            warning_id: Uuid::new_v4(),
            warning_type: WarningType::Threshold,
            warning_level: WarningLevel::Warning,
            ring_number: 1,
            timestamp: 0.0,
            indicator_name: "settlement_value".into(),
            indicator_value: Some(35.0),
            threshold_value: Some(30.0),
            threshold_type: Some(ThresholdType::Upper),
            rate_of_change: None,
            rate_multiplier: None,
            predicted_value: None,
            prediction_confidence: None,
            prediction_horizon_hours: None,
            combined_indicators: vec![],
            notification_channels: vec![],
            status: WarningStatus::Active,
            created_at: 0.0,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            notes: None,
        }
    }

    #[test]
    fn lifecycle_happy_path() {
        let mut e = sample_event();
        e.acknowledge("op1", None, 10.0).unwrap();
        assert_eq!(e.status, WarningStatus::Acknowledged);
        e.resolve(false, 20.0).unwrap();
        assert_eq!(e.status, WarningStatus::Resolved);
        assert!(e.resolve(false, 30.0).is_err());
    }

    #[test]
    fn severity_ordering() {
        assert!(WarningLevel::Alarm > WarningLevel::Warning);
        assert!(WarningLevel::Warning > WarningLevel::Attention);
        assert_eq!(WarningLevel::Alarm.downgrade_one(), WarningLevel::Warning);
        assert_eq!(WarningLevel::Attention.downgrade_one(), WarningLevel::Attention);
    }
}
