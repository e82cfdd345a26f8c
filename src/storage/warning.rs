//! `warning_thresholds` and `warning_events` tables (section 3, section 6).

use super::{time_key, Store, StorageResult};
use crate::types::{WarningEvent, WarningLevel, WarningStatus, WarningThreshold, WarningType};
use uuid::Uuid;

impl Store {
    pub fn put_warning_threshold(&self, threshold: &WarningThreshold) -> StorageResult<()> {
        let key = threshold.scope_key();
        self.warning_thresholds
            .insert(key.as_bytes(), serde_json::to_vec(threshold)?)?;
        Ok(())
    }

    pub fn list_warning_thresholds(&self) -> StorageResult<Vec<WarningThreshold>> {
        let mut out = Vec::new();
        for item in self.warning_thresholds.iter() {
            let (_, v) = item?;
            out.push(serde_json::from_slice(&v)?);
        }
        Ok(out)
    }

    pub fn append_warning_event(&self, event: &WarningEvent) -> StorageResult<()> {
        let key = time_key(event.timestamp, &event.warning_id.to_string());
        self.warning_events.insert(key, serde_json::to_vec(event)?)?;
        Ok(())
    }

    /// Warnings are append-mostly but their `status` mutates in place; the
    /// key (timestamp-based) never changes on update, so this is a plain
    /// overwrite of the existing value at the event's original key.
    pub fn update_warning_event(&self, event: &WarningEvent) -> StorageResult<()> {
        let key = time_key(event.created_at, &event.warning_id.to_string());
        self.warning_events.insert(key, serde_json::to_vec(event)?)?;
        Ok(())
    }

    pub fn get_warning_event(&self, warning_id: Uuid) -> StorageResult<Option<WarningEvent>> {
        for item in self.warning_events.iter() {
            let (_, v) = item?;
            let event: WarningEvent = serde_json::from_slice(&v)?;
            if event.warning_id == warning_id {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    pub fn list_warning_events(&self, filter: &WarningFilter) -> StorageResult<Vec<WarningEvent>> {
        let mut out = Vec::new();
        for item in self.warning_events.iter() {
            let (_, v) = item?;
            let event: WarningEvent = serde_json::from_slice(&v)?;
            if filter.matches(&event) {
                out.push(event);
            }
        }
        out.sort_by(|a, b| b.timestamp.partial_cmp(&a.timestamp).unwrap());
        Ok(out)
    }
}

/// Warning-list query filters (section 6: "filters
/// `{level, type, status, ring_number, indicator_name, start_time,
/// end_time}`").
#[derive(Debug, Clone, Default)]
pub struct WarningFilter {
    pub level: Option<WarningLevel>,
    pub warning_type: Option<WarningType>,
    pub status: Option<WarningStatus>,
    pub ring_number: Option<u64>,
    pub indicator_name: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

impl WarningFilter {
    fn matches(&self, event: &WarningEvent) -> bool {
        if let Some(level) = self.level {
            if event.warning_level != level {
                return false;
            }
        }
        if let Some(t) = self.warning_type {
            if event.warning_type != t {
                return false;
            }
        }
        if let Some(status) = self.status {
            if event.status != status {
                return false;
            }
        }
        if let Some(ring) = self.ring_number {
            if event.ring_number != ring {
                return false;
            }
        }
        if let Some(name) = &self.indicator_name {
            if &event.indicator_name != name {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if event.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if event.timestamp > end {
                return false;
            }
        }
        true
    }
}
