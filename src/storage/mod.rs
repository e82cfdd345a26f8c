//! Durable persistence layer.
//!
//! One `sled::Tree` per logical table from section 6's layout
//! (`plc_logs`, `attitude_logs`, `monitoring_logs`, `ring_summary`,
//! `warning_thresholds`, `warning_events`, `prediction_results`,
//! `work_orders`), following the key-encoding convention this codebase has
//! always used for time-ordered data: monotonic big-endian keys so a plain
//! byte-order tree iteration is also a chronological iteration.
//!
//! `sled` gives single-writer/many-reader semantics with write-ahead-log
//! durability for free (section 5: "uses the store's own transaction
//! mechanism with write-ahead logging or equivalent for concurrent read
//! availability during writes"), so no separate WAL layer is built here.

pub mod logs;
pub mod prediction;
pub mod ring_summary;
pub mod warning;
pub mod work_order;

use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found")]
    NotFound,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Handle to the full set of persisted tables. Cheaply cloneable — every
/// field is an `Arc`-backed `sled::Tree`.
#[derive(Clone)]
pub struct Store {
    pub db: Arc<sled::Db>,
    pub plc_logs: sled::Tree,
    pub attitude_logs: sled::Tree,
    pub monitoring_logs: sled::Tree,
    pub ring_summary: sled::Tree,
    pub warning_thresholds: sled::Tree,
    pub warning_events: sled::Tree,
    pub prediction_results: sled::Tree,
    pub work_orders: sled::Tree,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            plc_logs: db.open_tree("plc_logs")?,
            attitude_logs: db.open_tree("attitude_logs")?,
            monitoring_logs: db.open_tree("monitoring_logs")?,
            ring_summary: db.open_tree("ring_summary")?,
            warning_thresholds: db.open_tree("warning_thresholds")?,
            warning_events: db.open_tree("warning_events")?,
            prediction_results: db.open_tree("prediction_results")?,
            work_orders: db.open_tree("work_orders")?,
            db: Arc::new(db),
        })
    }

    /// In-memory store for tests: a temporary directory deleted on drop.
    #[cfg(any(test, feature = "test-util"))]
    pub fn temporary() -> (Self, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Self::open(dir.path()).expect("open temp store");
        (store, dir)
    }
}

/// Encode a timestamp as a sortable big-endian key. `sub_key` (e.g. a tag
/// name or source id) is appended so same-timestamp entries don't collide.
pub fn time_key(timestamp: f64, sub_key: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + sub_key.len());
    key.extend_from_slice(&timestamp.to_bits().to_be_bytes());
    key.extend_from_slice(sub_key.as_bytes());
    key
}

pub fn ring_key(ring_number: u64) -> [u8; 8] {
    ring_number.to_be_bytes()
}
