//! Calibration configuration — one of the five YAML documents named in
//! section 6. Grounded in `calibration.py`'s three transform types.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupKnot {
    pub raw: f64,
    pub calibrated: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalibrationTransform {
    Linear {
        #[serde(default)]
        offset: f64,
        #[serde(default = "one")]
        scale: f64,
    },
    Polynomial {
        coefficients: Vec<f64>,
    },
    Lookup {
        table: Vec<LookupKnot>,
    },
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCalibration {
    pub tag_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub transform: CalibrationTransform,
    pub valid_from: Option<Timestamp>,
    pub valid_until: Option<Timestamp>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub calibrations: Vec<TagCalibration>,
}

impl CalibrationConfig {
    pub fn load_yaml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn for_tag(&self, tag_name: &str) -> Option<&TagCalibration> {
        self.calibrations.iter().find(|c| c.tag_name == tag_name)
    }
}
