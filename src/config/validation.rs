//! Per-tag validation bounds configuration consumed by the threshold
//! validator (section 4.2: "Looks up `(min, max)` by tag"). Kept as its
//! own YAML document (`validation.yaml`) rather than folded into the
//! durable `warning_thresholds` table: the two "threshold" concepts in
//! the specification are distinct — this one gates raw sample validity,
//! the warning-engine one (`config::thresholds`) gates ring-level
//! indicator severity — and operators tune them on different schedules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::quality::threshold::TagBounds;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagBoundsEntry {
    pub tag_name: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub bounds: Vec<TagBoundsEntry>,
}

impl ValidationConfig {
    pub fn load_yaml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Indexes the loaded entries into the `HashMap` the
    /// [`crate::quality::threshold::ThresholdValidator`] constructor
    /// expects. Missing configuration for a tag stays permissive
    /// (section 4.2) — this just determines which tags have bounds at
    /// all.
    pub fn to_bounds_map(&self) -> HashMap<String, TagBounds> {
        self.bounds
            .iter()
            .map(|entry| (entry.tag_name.clone(), TagBounds { min: entry.min, max: entry.max }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_by_tag_name() {
        let cfg = ValidationConfig {
            bounds: vec![TagBoundsEntry { tag_name: "thrust_total".to_string(), min: 0.0, max: 40000.0 }],
        };
        let map = cfg.to_bounds_map();
        assert_eq!(map.get("thrust_total").unwrap().max, 40000.0);
    }
}
