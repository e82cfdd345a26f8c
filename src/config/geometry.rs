//! Alignment geometry configuration (shield diameter, ring width, search
//! windows for boundary detection) — one of the five YAML documents named
//! in section 6.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry and boundary-detection parameters for the ring aligner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentGeometry {
    /// Shield outer diameter, metres.
    pub shield_diameter_m: f64,
    /// Configured ring width, millimetres (default 1.5 m, section 4.4).
    pub ring_width_mm: f64,
    /// Matching tolerance for the advance-sensor method, millimetres.
    pub ring_width_tolerance_mm: f64,
    /// Typical ring duration used by the time-fallback method, seconds.
    pub typical_ring_duration_seconds: f64,
    /// Valid ring duration bounds, seconds.
    pub min_ring_duration_seconds: f64,
    pub max_ring_duration_seconds: f64,
    /// Tail-void thickness estimate used when not directly measured, mm.
    pub tail_void_thickness_mm: f64,
}

impl Default for AlignmentGeometry {
    fn default() -> Self {
        Self {
            shield_diameter_m: 6.0,
            ring_width_mm: 1500.0,
            ring_width_tolerance_mm: 200.0,
            typical_ring_duration_seconds: 45.0 * 60.0,
            min_ring_duration_seconds: 10.0 * 60.0,
            max_ring_duration_seconds: 120.0 * 60.0,
            tail_void_thickness_mm: 40.0,
        }
    }
}

impl AlignmentGeometry {
    /// Cross-sectional excavated volume per ring (m^3): `pi * (D/2)^2 * w`.
    pub fn excavated_volume_m3(&self) -> f64 {
        let radius = self.shield_diameter_m / 2.0;
        std::f64::consts::PI * radius * radius * (self.ring_width_mm / 1000.0)
    }

    pub fn load_yaml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excavated_volume_matches_cylinder_formula() {
        let g = AlignmentGeometry::default();
        let v = g.excavated_volume_m3();
        assert!((v - (std::f64::consts::PI * 9.0 * 1.5)).abs() < 1e-9);
    }
}
