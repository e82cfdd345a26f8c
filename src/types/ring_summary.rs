use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Timestamp;

/// `{mean, min, max, std, optional median}` feature set for one PLC tag
/// over a ring window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TagStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
    pub median: Option<f64>,
    pub sample_count: usize,
}

/// Trajectory-quality tier derived from the fraction of in-tolerance
/// attitude samples (section 4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryQuality {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl TrajectoryQuality {
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction >= 0.95 {
            TrajectoryQuality::Excellent
        } else if fraction >= 0.90 {
            TrajectoryQuality::Good
        } else if fraction >= 0.80 {
            TrajectoryQuality::Acceptable
        } else {
            TrajectoryQuality::Poor
        }
    }
}

/// Deviation-trend classification (supplemented feature, SPEC_FULL 2b).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationTrend {
    Improving,
    Stable,
    Worsening,
}

impl DeviationTrend {
    /// Slope is mm of deviation magnitude per sample index.
    pub fn from_slope(slope_mm_per_sample: f64) -> Self {
        if slope_mm_per_sample < -0.1 {
            DeviationTrend::Improving
        } else if slope_mm_per_sample > 0.1 {
            DeviationTrend::Worsening
        } else {
            DeviationTrend::Stable
        }
    }
}

/// Circular means (degrees) plus linear deviation stats for one ring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttitudeFeatures {
    pub pitch_mean_deg: Option<f64>,
    pub roll_mean_deg: Option<f64>,
    pub yaw_mean_deg: Option<f64>,
    pub horizontal_deviation: Option<TagStats>,
    pub vertical_deviation: Option<TagStats>,
    pub axis_deviation: Option<TagStats>,
    pub trajectory_quality: Option<TrajectoryQuality>,
    pub deviation_trend: Option<DeviationTrend>,
}

/// Engineering indicators computed from aggregated PLC features
/// (section 4.5). Each field is `None` whenever a required input is
/// missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivedIndicators {
    pub specific_energy: Option<f64>,
    pub ground_loss_rate: Option<f64>,
    pub volume_loss_ratio: Option<f64>,
    pub penetration_efficiency: Option<f64>,
    pub torque_thrust_ratio: Option<f64>,
    pub power_efficiency: Option<f64>,
}

/// Time-lagged settlement association (section 4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementFeatures {
    pub settlement_value: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std: Option<f64>,
    pub median: Option<f64>,
    pub sensor_count: usize,
    pub reading_count: usize,
}

/// Categorical completeness label (section 4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletenessFlag {
    Complete,
    Partial,
    Incomplete,
}

/// Durable, upsertable, one-per-ring construction summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingSummary {
    pub ring_number: u64,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub boundary_method: Option<String>,

    pub plc_features: HashMap<String, TagStats>,
    pub attitude_features: AttitudeFeatures,
    pub derived_indicators: DerivedIndicators,
    pub settlement: SettlementFeatures,

    pub data_completeness_flag: CompletenessFlag,
    pub geological_zone: Option<String>,
    pub synced_to_cloud: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RingSummary {
    pub fn duration_seconds(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Flattens PLC features and derived indicators into the `map<string,
    /// float>` envelope the warning engine consumes (section 9: "retaining
    /// a map<string, float> only for the indicator-value envelope").
    pub fn indicator_values(&self) -> HashMap<String, f64> {
        let mut out = HashMap::new();
        for (tag, stats) in &self.plc_features {
            out.insert(format!("mean_{tag}"), stats.mean);
        }
        if let Some(v) = self.derived_indicators.specific_energy {
            out.insert("specific_energy".to_string(), v);
        }
        if let Some(v) = self.derived_indicators.ground_loss_rate {
            out.insert("ground_loss_rate".to_string(), v);
        }
        if let Some(v) = self.derived_indicators.volume_loss_ratio {
            out.insert("volume_loss_ratio".to_string(), v);
        }
        if let Some(v) = self.derived_indicators.penetration_efficiency {
            out.insert("penetration_efficiency".to_string(), v);
        }
        if let Some(v) = self.derived_indicators.torque_thrust_ratio {
            out.insert("torque_thrust_ratio".to_string(), v);
        }
        if let Some(v) = self.derived_indicators.power_efficiency {
            out.insert("power_efficiency".to_string(), v);
        }
        if let Some(v) = self.settlement.settlement_value {
            out.insert("settlement_value".to_string(), v);
        }
        out
    }
}
