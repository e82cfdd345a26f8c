//! `prediction_results` table. The ML inference service that produces
//! predictions is an external collaborator (section 1: out of scope); this
//! module is the read/write side the warning engine's predictive checker
//! consumes (section 4.7 phase 3) and the manual-log/prediction API
//! exposes (section 6).

use super::{ring_key, Store, StorageResult};
use serde::{Deserialize, Serialize};

/// A single indicator prediction for a ring, as produced by the external
/// prediction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub ring_number: u64,
    pub indicator_name: String,
    pub predicted_value: f64,
    pub confidence: f64,
    pub confidence_upper_bound: f64,
    pub horizon_hours: f64,
    pub created_at: f64,
}

impl Store {
    pub fn put_prediction(&self, prediction: &PredictionResult) -> StorageResult<()> {
        let key = prediction_key(prediction.ring_number, &prediction.indicator_name);
        self.prediction_results.insert(key, serde_json::to_vec(prediction)?)?;
        Ok(())
    }

    pub fn predictions_for_ring(&self, ring_number: u64) -> StorageResult<Vec<PredictionResult>> {
        let prefix = ring_key(ring_number);
        let mut out = Vec::new();
        for item in self.prediction_results.scan_prefix(prefix) {
            let (_, v) = item?;
            out.push(serde_json::from_slice(&v)?);
        }
        Ok(out)
    }

    /// Latest prediction for `(ring_number, indicator_name)`, used by the
    /// predictive checker.
    pub fn latest_prediction(
        &self,
        ring_number: u64,
        indicator_name: &str,
    ) -> StorageResult<Option<PredictionResult>> {
        Ok(self
            .predictions_for_ring(ring_number)?
            .into_iter()
            .filter(|p| p.indicator_name == indicator_name)
            .max_by(|a, b| a.created_at.partial_cmp(&b.created_at).unwrap()))
    }

    pub fn latest_predictions_overall(&self, limit: usize) -> StorageResult<Vec<PredictionResult>> {
        let mut out: Vec<PredictionResult> = Vec::new();
        for item in self.prediction_results.iter() {
            let (_, v) = item?;
            out.push(serde_json::from_slice(&v)?);
        }
        out.sort_by(|a, b| b.created_at.partial_cmp(&a.created_at).unwrap());
        out.truncate(limit);
        Ok(out)
    }
}

fn prediction_key(ring_number: u64, indicator_name: &str) -> Vec<u8> {
    let mut key = ring_key(ring_number).to_vec();
    key.extend_from_slice(indicator_name.as_bytes());
    key
}
