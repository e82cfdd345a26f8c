//! Warning threshold configuration — loads the durable `WarningThreshold`
//! table from its YAML source document (section 6). Hot-reload support is
//! provided by [`ThresholdCache`], a lock-free swap-in view (section 5:
//! "writers invalidate a process-wide cached view by reload").

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::types::WarningThreshold;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ThresholdsDocument {
    pub thresholds: Vec<WarningThreshold>,
}

impl ThresholdsDocument {
    pub fn load_yaml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

/// Indexed, hot-reloadable view over the threshold table, keyed by
/// `"{indicator}_{zone}"` with a `"{indicator}_all"` fallback (section 4.7
/// phase 1, section 4.9's shared key format).
pub struct ThresholdCache {
    inner: ArcSwap<HashMap<String, WarningThreshold>>,
}

impl ThresholdCache {
    pub fn new(thresholds: Vec<WarningThreshold>) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(Self::index(thresholds))),
        }
    }

    fn index(thresholds: Vec<WarningThreshold>) -> HashMap<String, WarningThreshold> {
        thresholds
            .into_iter()
            .map(|t| (t.scope_key(), t))
            .collect()
    }

    /// Atomically replace the cached view (called on config reload).
    pub fn reload(&self, thresholds: Vec<WarningThreshold>) {
        self.inner.store(Arc::new(Self::index(thresholds)));
    }

    /// Look up `(indicator, zone)`, falling back to `(indicator, "all")`.
    pub fn lookup(&self, indicator: &str, zone: Option<&str>) -> Option<Arc<WarningThreshold>> {
        let snapshot = self.inner.load();
        if let Some(zone) = zone {
            let key = WarningThreshold::key(indicator, zone);
            if let Some(t) = snapshot.get(&key) {
                return Some(Arc::new(t.clone()));
            }
        }
        let wildcard_key = WarningThreshold::key(indicator, "all");
        snapshot.get(&wildcard_key).map(|t| Arc::new(t.clone()))
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
