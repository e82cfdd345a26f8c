//! Derived indicators calculator (section 4.5). Each output is `None`
//! whenever a required input is `None`.

use crate::config::geometry::AlignmentGeometry;
use crate::types::DerivedIndicators;

/// Aggregated inputs the derived-indicator formulas consume. All are
/// optional because any tag may be absent from a given ring's PLC
/// features.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivedInputs {
    pub mean_power_kw: Option<f64>,
    pub duration_hours: Option<f64>,
    pub grout_volume_m3: Option<f64>,
    pub tail_void_volume_m3: Option<f64>,
    pub mean_torque_knm: Option<f64>,
    pub mean_thrust_kn: Option<f64>,
    pub mean_advance_speed_m_per_min: Option<f64>,
    pub mean_cutterhead_power_kw: Option<f64>,
}

fn tail_void_volume(geometry: &AlignmentGeometry) -> f64 {
    let outer_radius_m = geometry.shield_diameter_m / 2.0;
    let inner_radius_m = outer_radius_m - geometry.tail_void_thickness_mm / 1000.0;
    let ring_width_m = geometry.ring_width_mm / 1000.0;
    std::f64::consts::PI * (outer_radius_m.powi(2) - inner_radius_m.max(0.0).powi(2)) * ring_width_m
}

pub fn compute(inputs: &DerivedInputs, geometry: &AlignmentGeometry) -> DerivedIndicators {
    let v_excav = geometry.excavated_volume_m3();

    let specific_energy = match (inputs.mean_power_kw, inputs.duration_hours) {
        (Some(power), Some(hours)) if v_excav > 0.0 => Some(power * hours * 3.6 / v_excav),
        _ => None,
    };

    let ground_loss_rate = inputs.grout_volume_m3.map(|grout| {
        let tail_void = inputs.tail_void_volume_m3.unwrap_or_else(|| tail_void_volume(geometry));
        grout - tail_void
    });

    let volume_loss_ratio = ground_loss_rate.map(|loss| if v_excav > 0.0 { loss.max(0.0) / v_excav * 100.0 } else { 0.0 });

    let torque_thrust_ratio = match (inputs.mean_torque_knm, inputs.mean_thrust_kn) {
        (Some(torque), Some(thrust)) if thrust > 0.0 => Some(torque / thrust),
        _ => None,
    };

    let penetration_efficiency = match (inputs.mean_advance_speed_m_per_min, inputs.mean_thrust_kn, inputs.mean_power_kw) {
        (Some(v), Some(thrust), Some(power)) if thrust * power != 0.0 => Some(v / (thrust * power) * 1e6),
        _ => None,
    };

    let power_efficiency = match (inputs.mean_cutterhead_power_kw, inputs.mean_power_kw) {
        (Some(cutterhead), Some(total)) if total > 0.0 => Some(cutterhead / total),
        _ => None,
    };

    DerivedIndicators {
        specific_energy,
        ground_loss_rate,
        volume_loss_ratio,
        penetration_efficiency,
        torque_thrust_ratio,
        power_efficiency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_inputs_yield_null_fields() {
        let geometry = AlignmentGeometry::default();
        let out = compute(&DerivedInputs::default(), &geometry);
        assert!(out.specific_energy.is_none());
        assert!(out.torque_thrust_ratio.is_none());
    }

    #[test]
    fn torque_thrust_ratio_requires_positive_thrust() {
        let geometry = AlignmentGeometry::default();
        let inputs = DerivedInputs { mean_torque_knm: Some(3000.0), mean_thrust_kn: Some(20000.0), ..Default::default() };
        let out = compute(&inputs, &geometry);
        assert!((out.torque_thrust_ratio.unwrap() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn specific_energy_matches_formula() {
        let geometry = AlignmentGeometry::default();
        let inputs = DerivedInputs { mean_power_kw: Some(1000.0), duration_hours: Some(0.5), ..Default::default() };
        let out = compute(&inputs, &geometry);
        let expected = 1000.0 * 0.5 * 3.6 / geometry.excavated_volume_m3();
        assert!((out.specific_energy.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn volume_loss_ratio_floors_negative_loss_at_zero() {
        let geometry = AlignmentGeometry::default();
        let inputs = DerivedInputs { grout_volume_m3: Some(1.0), tail_void_volume_m3: Some(5.0), ..Default::default() };
        let out = compute(&inputs, &geometry);
        assert_eq!(out.volume_loss_ratio, Some(0.0));
    }
}
