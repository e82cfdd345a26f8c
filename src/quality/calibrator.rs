//! Calibrator (section 4.2): applies one of three transforms by tag.
//! Calibrations may carry a `valid_from`/`valid_until` window; samples
//! outside the window bypass calibration and retain their pre-calibration
//! quality flag.

use std::collections::HashMap;

use crate::config::calibration::{CalibrationTransform, TagCalibration};
use crate::types::{Payload, QualityFlag, Sample};

#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    by_tag: HashMap<String, TagCalibration>,
}

impl Calibrator {
    pub fn new(calibrations: Vec<TagCalibration>) -> Self {
        Self {
            by_tag: calibrations.into_iter().map(|c| (c.tag_name.clone(), c)).collect(),
        }
    }

    /// Applies the configured transform to `sample`, if any applies.
    /// Returns `None` when there is no configuration, the tag is
    /// disabled, the sample isn't a PLC reading, or the sample falls
    /// outside the calibration's validity window.
    pub fn apply(&self, tag_name: &str, sample: &Sample) -> Option<Sample> {
        let calibration = self.by_tag.get(tag_name)?;
        if !calibration.enabled {
            return None;
        }
        if let Some(from) = calibration.valid_from {
            if sample.timestamp < from {
                return None;
            }
        }
        if let Some(until) = calibration.valid_until {
            if sample.timestamp > until {
                return None;
            }
        }
        let Payload::Plc { tag_name, value } = &sample.payload else {
            return None;
        };
        let calibrated_value = apply_transform(&calibration.transform, *value);
        let mut out = sample.clone();
        out.payload = Payload::Plc { tag_name: tag_name.clone(), value: calibrated_value };
        out.set_quality_flag(QualityFlag::Calibrated);
        Some(out)
    }
}

fn apply_transform(transform: &CalibrationTransform, x: f64) -> f64 {
    match transform {
        CalibrationTransform::Linear { offset, scale } => (x + offset) * scale,
        CalibrationTransform::Polynomial { coefficients } => coefficients
            .iter()
            .enumerate()
            .map(|(i, c)| c * x.powi(i as i32))
            .sum(),
        CalibrationTransform::Lookup { table } => lookup_interpolate(table, x),
    }
}

fn lookup_interpolate(table: &[crate::config::calibration::LookupKnot], x: f64) -> f64 {
    if table.is_empty() {
        return x;
    }
    let mut sorted: Vec<_> = table.iter().collect();
    sorted.sort_by(|a, b| a.raw.partial_cmp(&b.raw).unwrap());

    if x <= sorted[0].raw {
        return sorted[0].calibrated;
    }
    if x >= sorted[sorted.len() - 1].raw {
        return sorted[sorted.len() - 1].calibrated;
    }
    for window in sorted.windows(2) {
        let (lo, hi) = (window[0], window[1]);
        if x >= lo.raw && x <= hi.raw {
            let fraction = (x - lo.raw) / (hi.raw - lo.raw);
            return lo.calibrated + (hi.calibrated - lo.calibrated) * fraction;
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::calibration::LookupKnot;
    use crate::types::plc_reading;

    fn calibration(tag: &str, transform: CalibrationTransform) -> TagCalibration {
        TagCalibration { tag_name: tag.to_string(), enabled: true, transform, valid_from: None, valid_until: None }
    }

    #[test]
    fn linear_transform() {
        let cal = Calibrator::new(vec![calibration(
            "thrust_total",
            CalibrationTransform::Linear { offset: 10.0, scale: 2.0 },
        )]);
        let s = plc_reading("plc-1", 0.0, "thrust_total", 5.0);
        let out = cal.apply("thrust_total", &s).unwrap();
        assert_eq!(out.value(), Some(30.0));
    }

    #[test]
    fn lookup_clamps_outside_range() {
        let cal = Calibrator::new(vec![calibration(
            "thrust_total",
            CalibrationTransform::Lookup {
                table: vec![
                    LookupKnot { raw: 0.0, calibrated: 0.0 },
                    LookupKnot { raw: 10.0, calibrated: 20.0 },
                ],
            },
        )]);
        let s = plc_reading("plc-1", 0.0, "thrust_total", -5.0);
        assert_eq!(cal.apply("thrust_total", &s).unwrap().value(), Some(0.0));
        let s2 = plc_reading("plc-1", 0.0, "thrust_total", 5.0);
        assert_eq!(cal.apply("thrust_total", &s2).unwrap().value(), Some(10.0));
    }

    #[test]
    fn bypasses_outside_validity_window() {
        let mut c = calibration("thrust_total", CalibrationTransform::Linear { offset: 0.0, scale: 2.0 });
        c.valid_from = Some(100.0);
        c.valid_until = Some(200.0);
        let cal = Calibrator::new(vec![c]);
        let s = plc_reading("plc-1", 50.0, "thrust_total", 5.0);
        assert!(cal.apply("thrust_total", &s).is_none());
    }
}
