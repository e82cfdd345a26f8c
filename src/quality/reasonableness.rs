//! Reasonableness checker (section 4.2): operates on a concurrent
//! multi-tag snapshot rather than a single sample. Failures are reported
//! per-rule; samples are not rejected by reasonableness alone, only
//! tagged for metrics.

use crate::config::reasonableness::ReasonablenessConfig;

/// A same-instant snapshot of the PLC tags the reasonableness rules
/// reference. Any field absent means the corresponding rule is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlcSnapshot {
    pub thrust_total_kn: Option<f64>,
    pub penetration_rate_mm_per_min: Option<f64>,
    pub torque_total_knm: Option<f64>,
    pub chamber_pressure_bar: Option<f64>,
    pub depth_m: Option<f64>,
    pub power_consumption_kw: Option<f64>,
    pub advance_speed_m_per_min: Option<f64>,
    pub cutterhead_rpm: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonablenessRule {
    ThrustPenetrationRatio,
    TorqueThrustRatio,
    ChamberPressurePerDepth,
    PowerConsistency,
}

#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub rule: ReasonablenessRule,
    pub passed: bool,
    pub detail: String,
}

/// Runs every enabled rule whose inputs are present in `snapshot`.
/// Returns only the rules that actually ran — a rule whose inputs are
/// `None`, or that is disabled, contributes no outcome (section 4.2:
/// "Failures are reported per-rule").
pub fn check(config: &ReasonablenessConfig, snapshot: &PlcSnapshot) -> Vec<RuleOutcome> {
    let mut outcomes = Vec::new();

    if config.thrust_penetration_ratio_enabled {
        if let (Some(thrust), Some(penetration)) =
            (snapshot.thrust_total_kn, snapshot.penetration_rate_mm_per_min)
        {
            if penetration.abs() > 1e-9 {
                let ratio = thrust / penetration;
                let passed = config.thrust_penetration_ratio.contains(ratio);
                outcomes.push(RuleOutcome {
                    rule: ReasonablenessRule::ThrustPenetrationRatio,
                    passed,
                    detail: format!("thrust/penetration ratio = {ratio:.2}"),
                });
            }
        }
    }

    if config.torque_thrust_ratio_enabled {
        if let (Some(torque), Some(thrust)) = (snapshot.torque_total_knm, snapshot.thrust_total_kn) {
            if thrust.abs() > 1e-9 {
                let ratio = torque / thrust;
                let passed = config.torque_thrust_ratio.contains(ratio);
                outcomes.push(RuleOutcome {
                    rule: ReasonablenessRule::TorqueThrustRatio,
                    passed,
                    detail: format!("torque/thrust ratio = {ratio:.4}"),
                });
            }
        }
    }

    if config.chamber_pressure_per_depth_enabled {
        if let (Some(pressure), Some(depth)) = (snapshot.chamber_pressure_bar, snapshot.depth_m) {
            if depth.abs() > 1e-9 {
                let ratio = pressure / depth;
                let passed = config.chamber_pressure_per_depth_bar_per_m.contains(ratio);
                outcomes.push(RuleOutcome {
                    rule: ReasonablenessRule::ChamberPressurePerDepth,
                    passed,
                    detail: format!("chamber pressure/depth = {ratio:.4} bar/m"),
                });
            }
        }
    }

    if config.power_consistency_enabled {
        if let (Some(power), Some(thrust), Some(advance), Some(torque), Some(rpm)) = (
            snapshot.power_consumption_kw,
            snapshot.thrust_total_kn,
            snapshot.advance_speed_m_per_min,
            snapshot.torque_total_knm,
            snapshot.cutterhead_rpm,
        ) {
            let omega_rad_per_s = rpm * std::f64::consts::TAU / 60.0;
            let v_m_per_s = advance / 60.0;
            let expected_kw = thrust * v_m_per_s + torque * omega_rad_per_s;
            let lower = expected_kw * config.power_consistency_lower_fraction;
            let upper = expected_kw * config.power_consistency_upper_fraction;
            let passed = if expected_kw.abs() < 1e-9 {
                power.abs() < 1e-6
            } else {
                power >= lower.min(upper) && power <= lower.max(upper)
            };
            outcomes.push(RuleOutcome {
                rule: ReasonablenessRule::PowerConsistency,
                passed,
                detail: format!("power {power:.1} kW vs expected {expected_kw:.1} kW"),
            });
        }
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thrust_penetration_ratio_within_bounds_passes() {
        let config = ReasonablenessConfig::default();
        let snapshot = PlcSnapshot {
            thrust_total_kn: Some(20000.0),
            penetration_rate_mm_per_min: Some(20.0),
            ..Default::default()
        };
        let outcomes = check(&config, &snapshot);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].passed);
    }

    #[test]
    fn missing_inputs_skip_the_rule() {
        let config = ReasonablenessConfig::default();
        let outcomes = check(&config, &PlcSnapshot::default());
        assert!(outcomes.is_empty());
    }

    #[test]
    fn torque_thrust_ratio_out_of_bounds_fails() {
        let config = ReasonablenessConfig::default();
        let snapshot = PlcSnapshot { torque_total_knm: Some(5000.0), thrust_total_kn: Some(10000.0), ..Default::default() };
        let outcomes = check(&config, &snapshot);
        assert!(!outcomes[0].passed);
    }
}
