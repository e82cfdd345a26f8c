//! `ring_summary` table: one upsertable row per ring (section 4.6).

use super::{ring_key, Store, StorageResult};
use crate::types::RingSummary;

impl Store {
    pub fn upsert_ring_summary(&self, summary: &RingSummary) -> StorageResult<()> {
        let key = ring_key(summary.ring_number);
        let value = serde_json::to_vec(summary)?;
        self.ring_summary.insert(key, value)?;
        Ok(())
    }

    pub fn get_ring_summary(&self, ring_number: u64) -> StorageResult<Option<RingSummary>> {
        match self.ring_summary.get(ring_key(ring_number))? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    /// The highest `ring_number` with a stored summary, if any (used by
    /// the aligner to resolve `previous_ring_end` for the time-fallback
    /// boundary method, section 4.4).
    pub fn latest_ring_summary(&self) -> StorageResult<Option<RingSummary>> {
        match self.ring_summary.last()? {
            Some((_, v)) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    pub fn list_ring_summaries(
        &self,
        start_ring: Option<u64>,
        end_ring: Option<u64>,
    ) -> StorageResult<Vec<RingSummary>> {
        let lo = start_ring.map(ring_key).unwrap_or([0u8; 8]);
        let hi = end_ring.map(ring_key).unwrap_or([0xFFu8; 8]);
        let mut out = Vec::new();
        for item in self.ring_summary.range(lo..=hi) {
            let (_, v) = item?;
            out.push(serde_json::from_slice(&v)?);
        }
        Ok(out)
    }

    /// Last `window_size` ring summaries with `ring_number < before`,
    /// ascending, for the rate checker (section 4.7 phase 2).
    pub fn recent_ring_summaries_before(
        &self,
        before: u64,
        window_size: usize,
    ) -> StorageResult<Vec<RingSummary>> {
        let hi = ring_key(before.saturating_sub(1));
        let mut out = Vec::new();
        for item in self.ring_summary.range(..=hi).rev() {
            if out.len() >= window_size {
                break;
            }
            let (_, v) = item?;
            out.push(serde_json::from_slice(&v)?);
        }
        out.reverse();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttitudeFeatures, CompletenessFlag, DerivedIndicators, SettlementFeatures};
    use std::collections::HashMap;

    fn summary(ring_number: u64) -> RingSummary {
        RingSummary {
            ring_number,
            start_time: 0.0,
            end_time: 100.0,
            boundary_method: None,
            plc_features: HashMap::new(),
            attitude_features: AttitudeFeatures::default(),
            derived_indicators: DerivedIndicators::default(),
            settlement: SettlementFeatures::default(),
            data_completeness_flag: CompletenessFlag::Complete,
            geological_zone: None,
            synced_to_cloud: false,
            created_at: 0.0,
            updated_at: 0.0,
        }
    }

    #[test]
    fn upsert_is_idempotent_by_ring_number() {
        let (store, _dir) = Store::temporary();
        store.upsert_ring_summary(&summary(5)).unwrap();
        let mut s2 = summary(5);
        s2.updated_at = 10.0;
        store.upsert_ring_summary(&s2).unwrap();
        assert_eq!(store.list_ring_summaries(None, None).unwrap().len(), 1);
        assert_eq!(store.get_ring_summary(5).unwrap().unwrap().updated_at, 10.0);
    }

    #[test]
    fn recent_window_excludes_current_and_respects_order() {
        let (store, _dir) = Store::temporary();
        for n in 1..=12u64 {
            store.upsert_ring_summary(&summary(n)).unwrap();
        }
        let recent = store.recent_ring_summaries_before(12, 10).unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().unwrap().ring_number, 2);
        assert_eq!(recent.last().unwrap().ring_number, 11);
    }
}
