//! `plc_logs` / `attitude_logs` / `monitoring_logs` tables: append-only
//! time-ordered sample storage, read back by the ring aggregators
//! (section 4.5) and the manual-log/raw-data API routes (section 6).

use super::{time_key, Store, StorageResult};
use crate::types::{Sample, SampleKind, Timestamp};

impl Store {
    fn tree_for(&self, kind: SampleKind) -> &sled::Tree {
        match kind {
            SampleKind::Plc => &self.plc_logs,
            SampleKind::Attitude => &self.attitude_logs,
            SampleKind::Monitoring => &self.monitoring_logs,
        }
    }

    /// Insert one sample, keyed by `(timestamp, source_id)` for
    /// chronological iteration (section 6 index convention).
    pub fn insert_sample(&self, sample: &Sample) -> StorageResult<()> {
        let tree = self.tree_for(sample.kind());
        let key = time_key(sample.timestamp, &sample.source_id);
        let value = serde_json::to_vec(sample)?;
        tree.insert(key, value)?;
        Ok(())
    }

    /// Batched insert for [`crate::buffer::BufferWriter`] flushes. All
    /// entries land in a single tree-local batch; sled applies a batch
    /// atomically.
    pub fn insert_samples_batch(&self, kind: SampleKind, samples: &[Sample]) -> StorageResult<()> {
        let tree = self.tree_for(kind);
        let mut batch = sled::Batch::default();
        for sample in samples {
            let key = time_key(sample.timestamp, &sample.source_id);
            batch.insert(key, serde_json::to_vec(sample)?);
        }
        tree.apply_batch(batch)?;
        Ok(())
    }

    /// All samples of `kind` with `start <= timestamp <= end`, in
    /// chronological order.
    pub fn samples_in_range(
        &self,
        kind: SampleKind,
        start: Timestamp,
        end: Timestamp,
    ) -> StorageResult<Vec<Sample>> {
        let tree = self.tree_for(kind);
        let lo = time_key(start, "");
        let hi = time_key(end, "\u{10FFFF}");
        let mut out = Vec::new();
        for item in tree.range(lo..=hi) {
            let (_, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    /// Samples of `kind` in range restricted to a PLC tag name / sensor
    /// type (filtered post-fetch — sled has no secondary index, and this
    /// is an edge-scale store, not a warehouse).
    pub fn samples_in_range_for_tag(
        &self,
        kind: SampleKind,
        tag_or_type: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> StorageResult<Vec<Sample>> {
        let all = self.samples_in_range(kind, start, end)?;
        Ok(all
            .into_iter()
            .filter(|s| match &s.payload {
                crate::types::Payload::Plc { tag_name, .. } => tag_name == tag_or_type,
                crate::types::Payload::Monitoring { sensor_type, .. } => sensor_type == tag_or_type,
                crate::types::Payload::Attitude { .. } => false,
            })
            .collect())
    }

    pub fn count_in_range(&self, kind: SampleKind, start: Timestamp, end: Timestamp) -> StorageResult<usize> {
        Ok(self.samples_in_range(kind, start, end)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Payload;

    #[test]
    fn round_trips_samples_in_order() {
        let (store, _dir) = Store::temporary();
        for (i, ts) in [1000.0, 1002.0, 1001.0].into_iter().enumerate() {
            let s = Sample::new(
                format!("plc-{i}"),
                ts,
                Payload::Plc { tag_name: "thrust_total".into(), value: 100.0 },
            );
            store.insert_sample(&s).unwrap();
        }
        let got = store.samples_in_range(SampleKind::Plc, 0.0, 2000.0).unwrap();
        let timestamps: Vec<_> = got.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![1000.0, 1001.0, 1002.0]);
    }

    #[test]
    fn filters_by_tag_name() {
        let (store, _dir) = Store::temporary();
        store.insert_sample(&Sample::new("a", 1.0, Payload::Plc { tag_name: "thrust_total".into(), value: 1.0 })).unwrap();
        store.insert_sample(&Sample::new("b", 2.0, Payload::Plc { tag_name: "torque_total".into(), value: 2.0 })).unwrap();
        let got = store
            .samples_in_range_for_tag(SampleKind::Plc, "thrust_total", 0.0, 10.0)
            .unwrap();
        assert_eq!(got.len(), 1);
    }
}
