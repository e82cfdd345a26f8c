//! Attitude aggregator (section 4.5): circular means for angular
//! quantities (pitch/roll/yaw), linear statistics for deviations, a
//! trajectory-quality metric, and the deviation-trend classification
//! (supplemented feature, SPEC_FULL 2b).

use crate::config::defaults::TRAJECTORY_DEVIATION_TOLERANCE_MM;
use crate::types::{AttitudeFeatures, DeviationTrend, Payload, QualityFlag, Sample, TagStats, TrajectoryQuality};

/// `atan2(mean(sin theta), mean(cos theta))`, converted back to degrees.
/// Ensures e.g. `mean(359, 1) ~= 0` (section 4.5, testable property in
/// section 8).
pub fn circular_mean_degrees(angles_deg: &[f64]) -> Option<f64> {
    if angles_deg.is_empty() {
        return None;
    }
    let n = angles_deg.len() as f64;
    let sin_sum: f64 = angles_deg.iter().map(|a| a.to_radians().sin()).sum();
    let cos_sum: f64 = angles_deg.iter().map(|a| a.to_radians().cos()).sum();
    let mean_rad = (sin_sum / n).atan2(cos_sum / n);
    let mean_deg = mean_rad.to_degrees();
    Some(if mean_deg < 0.0 { mean_deg + 360.0 } else { mean_deg }.rem_euclid(360.0))
}

fn linear_stats(values: &[f64]) -> Option<TagStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(TagStats { mean, min, max, std: variance.sqrt(), median: None, sample_count: values.len() })
}

/// Fraction of samples within `tolerance_mm` Euclidean deviation,
/// categorized per section 4.5's tiers.
fn trajectory_quality(deviation_magnitudes_mm: &[f64], tolerance_mm: f64) -> Option<TrajectoryQuality> {
    if deviation_magnitudes_mm.is_empty() {
        return None;
    }
    let within = deviation_magnitudes_mm.iter().filter(|m| **m <= tolerance_mm).count();
    let fraction = within as f64 / deviation_magnitudes_mm.len() as f64;
    Some(TrajectoryQuality::from_fraction(fraction))
}

/// Ordinary-least-squares slope of deviation magnitude against sample
/// index (mm per sample), used for the deviation-trend classification.
fn deviation_slope(deviation_magnitudes_mm: &[f64]) -> Option<f64> {
    let n = deviation_magnitudes_mm.len();
    if n < 2 {
        return None;
    }
    let n_f = n as f64;
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let x_mean = xs.iter().sum::<f64>() / n_f;
    let y_mean = deviation_magnitudes_mm.iter().sum::<f64>() / n_f;
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, y) in xs.iter().zip(deviation_magnitudes_mm) {
        numerator += (x - x_mean) * (y - y_mean);
        denominator += (x - x_mean).powi(2);
    }
    if denominator.abs() < 1e-12 {
        return Some(0.0);
    }
    Some(numerator / denominator)
}

/// Aggregates a ring's worth of attitude samples into [`AttitudeFeatures`].
/// Excludes `rejected`/`missing` samples (section 4.5, universal invariant
/// in section 8: rejected samples never counted in any aggregate).
pub fn aggregate(samples: &[Sample]) -> AttitudeFeatures {
    let mut pitches = Vec::new();
    let mut rolls = Vec::new();
    let mut yaws = Vec::new();
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    let mut axis = Vec::new();
    let mut magnitudes = Vec::new();

    for sample in samples {
        if matches!(sample.quality_flag, QualityFlag::Rejected | QualityFlag::Missing) {
            continue;
        }
        if let Payload::Attitude { pitch, roll, yaw, horizontal_deviation, vertical_deviation, axis_deviation } =
            &sample.payload
        {
            pitches.push(*pitch);
            rolls.push(*roll);
            yaws.push(*yaw);
            horizontal.push(*horizontal_deviation);
            vertical.push(*vertical_deviation);
            axis.push(*axis_deviation);
            magnitudes.push((horizontal_deviation.powi(2) + vertical_deviation.powi(2) + axis_deviation.powi(2)).sqrt());
        }
    }

    AttitudeFeatures {
        pitch_mean_deg: circular_mean_degrees(&pitches),
        roll_mean_deg: circular_mean_degrees(&rolls),
        yaw_mean_deg: circular_mean_degrees(&yaws),
        horizontal_deviation: linear_stats(&horizontal),
        vertical_deviation: linear_stats(&vertical),
        axis_deviation: linear_stats(&axis),
        trajectory_quality: trajectory_quality(&magnitudes, TRAJECTORY_DEVIATION_TOLERANCE_MM),
        deviation_trend: deviation_slope(&magnitudes).map(DeviationTrend::from_slope),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;

    fn attitude_sample(ts: f64, pitch: f64, roll: f64, yaw: f64, h: f64, v: f64, a: f64) -> Sample {
        Sample::new(
            "guidance-1",
            ts,
            Payload::Attitude { pitch, roll, yaw, horizontal_deviation: h, vertical_deviation: v, axis_deviation: a },
        )
    }

    #[test]
    fn circular_mean_wraps_correctly() {
        let mean = circular_mean_degrees(&[359.0, 1.0]).unwrap();
        assert!(mean < 0.01 || mean > 359.99, "mean was {mean}");
    }

    #[test]
    fn trajectory_quality_tiers() {
        let samples: Vec<Sample> = (0..100).map(|i| attitude_sample(i as f64, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0)).collect();
        let features = aggregate(&samples);
        // magnitude = sqrt(300) ~= 17.3mm, within 50mm tolerance for all samples
        assert_eq!(features.trajectory_quality, Some(TrajectoryQuality::Excellent));
    }

    #[test]
    fn deviation_trend_classifies_worsening() {
        let samples: Vec<Sample> = (0..20)
            .map(|i| attitude_sample(i as f64, 0.0, 0.0, 0.0, i as f64 * 2.0, 0.0, 0.0))
            .collect();
        let features = aggregate(&samples);
        assert_eq!(features.deviation_trend, Some(DeviationTrend::Worsening));
    }

    #[test]
    fn excludes_rejected_and_missing_from_aggregates() {
        let mut rejected = attitude_sample(0.0, 90.0, 90.0, 90.0, 9999.0, 9999.0, 9999.0);
        rejected.set_quality_flag(QualityFlag::Rejected);
        let mut missing = attitude_sample(0.5, 90.0, 90.0, 90.0, 9999.0, 9999.0, 9999.0);
        missing.set_quality_flag(QualityFlag::Missing);
        let samples = vec![
            attitude_sample(1.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0),
            attitude_sample(2.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0),
            rejected,
            missing,
        ];
        let features = aggregate(&samples);
        assert_eq!(features.pitch_mean_deg, Some(0.0));
        assert_eq!(features.horizontal_deviation.unwrap().sample_count, 2);
    }
}
