//! Reasonableness-rule configuration — one of the five YAML documents
//! named in section 6. Bounds default to [`crate::config::defaults`] but
//! can be widened/narrowed per deployment (different machines, different
//! geology) without a rebuild.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::defaults;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Physics-derived predicates applied by the reasonableness checker
/// (section 4.2). Each rule is independently toggleable; a disabled rule
/// is skipped rather than treated as passing, so metrics only count rules
/// that actually ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonablenessConfig {
    pub thrust_penetration_ratio_enabled: bool,
    pub thrust_penetration_ratio: Bounds,

    pub torque_thrust_ratio_enabled: bool,
    pub torque_thrust_ratio: Bounds,

    pub chamber_pressure_per_depth_enabled: bool,
    pub chamber_pressure_per_depth_bar_per_m: Bounds,

    pub power_consistency_enabled: bool,
    pub power_consistency_lower_fraction: f64,
    pub power_consistency_upper_fraction: f64,
}

impl Default for ReasonablenessConfig {
    fn default() -> Self {
        Self {
            thrust_penetration_ratio_enabled: true,
            thrust_penetration_ratio: Bounds {
                min: defaults::THRUST_PENETRATION_RATIO_MIN,
                max: defaults::THRUST_PENETRATION_RATIO_MAX,
            },
            torque_thrust_ratio_enabled: true,
            torque_thrust_ratio: Bounds {
                min: defaults::TORQUE_THRUST_RATIO_MIN,
                max: defaults::TORQUE_THRUST_RATIO_MAX,
            },
            chamber_pressure_per_depth_enabled: true,
            chamber_pressure_per_depth_bar_per_m: Bounds {
                min: defaults::CHAMBER_PRESSURE_PER_DEPTH_MIN_BAR_M,
                max: defaults::CHAMBER_PRESSURE_PER_DEPTH_MAX_BAR_M,
            },
            power_consistency_enabled: true,
            power_consistency_lower_fraction: defaults::POWER_CONSISTENCY_LOWER_FRACTION,
            power_consistency_upper_fraction: defaults::POWER_CONSISTENCY_UPPER_FRACTION,
        }
    }
}

impl ReasonablenessConfig {
    pub fn load_yaml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}
