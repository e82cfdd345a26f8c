//! PLC aggregator (section 4.5): per-tag `{mean, min, max, std, median}`
//! over a ring window, with optional tag-name remapping onto stable
//! feature names.

use std::collections::HashMap;

use crate::types::{QualityFlag, Sample, TagStats};

const MEDIAN_SAMPLE_CAP: usize = 10_000;

/// Computes [`TagStats`] for one tag's samples within a ring window.
/// Excludes `rejected`/`missing` samples and non-finite values (section
/// 4.5, universal invariant in section 8: rejected samples never counted
/// in any aggregate).
pub fn aggregate_tag(samples: &[Sample]) -> Option<TagStats> {
    let values: Vec<f64> = samples
        .iter()
        .filter(|s| !matches!(s.quality_flag, QualityFlag::Rejected | QualityFlag::Missing))
        .filter_map(|s| s.value())
        .filter(|v| v.is_finite())
        .collect();

    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    let median = if values.len() <= MEDIAN_SAMPLE_CAP {
        Some(median_of(&values))
    } else {
        None
    };

    Some(TagStats { mean, min, max, std, median, sample_count: values.len() })
}

fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Groups samples by tag name, remapping raw tag names onto stable
/// feature names where configured, then aggregates each group.
pub fn aggregate_all(samples: &[Sample], tag_remap: &HashMap<String, String>) -> HashMap<String, TagStats> {
    let mut grouped: HashMap<String, Vec<Sample>> = HashMap::new();
    for sample in samples {
        if let Some(tag) = sample.tag_name() {
            let feature_name = tag_remap.get(tag).cloned().unwrap_or_else(|| tag.to_string());
            grouped.entry(feature_name).or_default().push(sample.clone());
        }
    }

    grouped
        .into_iter()
        .filter_map(|(name, samples)| aggregate_tag(&samples).map(|stats| (name, stats)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::plc_reading;

    #[test]
    fn excludes_rejected_and_missing_from_aggregates() {
        let mut rejected = plc_reading("p", 0.0, "thrust_total", 99999.0);
        rejected.set_quality_flag(QualityFlag::Rejected);
        let samples = vec![
            plc_reading("p", 1.0, "thrust_total", 10.0),
            plc_reading("p", 2.0, "thrust_total", 20.0),
            plc_reading("p", 3.0, "thrust_total", 30.0),
            rejected,
        ];
        let stats = aggregate_tag(&samples).unwrap();
        assert_eq!(stats.sample_count, 3);
        assert!((stats.mean - 20.0).abs() < 1e-9);
        assert_eq!(stats.median, Some(20.0));
    }

    #[test]
    fn tag_remap_projects_onto_stable_names() {
        let samples = vec![plc_reading("p", 1.0, "AI_THRUST_01", 100.0)];
        let mut remap = HashMap::new();
        remap.insert("AI_THRUST_01".to_string(), "thrust_total".to_string());
        let out = aggregate_all(&samples, &remap);
        assert!(out.contains_key("thrust_total"));
        assert!(!out.contains_key("AI_THRUST_01"));
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(aggregate_tag(&[]).is_none());
    }
}
