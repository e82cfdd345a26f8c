//! Warning engine (section 4.7): evaluates one ring in seven phases —
//! threshold, rate, predictive, hysteresis filtering, combined
//! aggregation, persistence, and notification dispatch.

pub mod combiner;
pub mod engine;
pub mod hysteresis;
pub mod predictive_checker;
pub mod rate_checker;
pub mod threshold_checker;

#[derive(Debug, thiserror::Error)]
pub enum WarningError {
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
}

/// Evaluates a value against a threshold's three tiers in decreasing
/// severity (`ALARM`, `WARNING`, `ATTENTION`); the first hit wins. Shared
/// by the threshold checker and the predictive checker's crossing tests
/// (section 4.7 phases 1 and 3).
///
/// Bounds are inclusive: a value exactly at a tier's bound fires that
/// tier. Section 9's resolved open question: the original's strict `>`/`<`
/// comparison leaves a value exactly at the boundary unfired, which
/// contradicts the explicit testable scenario in section 8 (value `20`
/// against an attention upper bound of `20` must emit `ATTENTION` with
/// `threshold_value = 20`); the scenario, not the original's strictness,
/// is followed here.
pub fn evaluate_tier(
    value: f64,
    threshold: &crate::types::WarningThreshold,
) -> Option<(crate::types::WarningLevel, f64, crate::types::ThresholdType)> {
    use crate::types::WarningLevel::{Alarm, Attention, Warning};

    for level in [Alarm, Warning, Attention] {
        let bounds = threshold.bounds_for(level);
        if let Some(lower) = bounds.lower {
            if value <= lower {
                return Some((level, lower, crate::types::ThresholdType::Lower));
            }
        }
        if let Some(upper) = bounds.upper {
            if value >= upper {
                return Some((level, upper, crate::types::ThresholdType::Upper));
            }
        }
    }
    None
}
