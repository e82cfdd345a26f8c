//! Buffer writer (section 4.3): backpressure-aware batcher that coalesces
//! samples into batched persistent writes with bounded memory and bounded
//! loss.
//!
//! Concurrency model: producers are many, the flusher is single. Adds are
//! O(1) under a mutex; a flush takes a consistent snapshot, releases the
//! lock, then writes (section 4.3, section 5).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::Notify;

use crate::config::defaults::DEFAULT_BUFFER_MAX_SIZE;
use crate::storage::{Store, StorageError};
use crate::types::{Sample, SampleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    DropOldest,
    DropNewest,
    Block,
}

#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct BufferStats {
    pub received: u64,
    pub written: u64,
    pub dropped: u64,
    pub flush_count: u64,
    pub last_flush_time: Option<f64>,
}

impl BufferStats {
    pub fn drop_rate(&self) -> f64 {
        if self.received == 0 {
            0.0
        } else {
            self.dropped as f64 / self.received as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    flush_count: AtomicU64,
    last_flush_time_bits: AtomicU64,
}

pub struct BufferWriter {
    max_size: usize,
    policy: OverflowPolicy,
    pending: Mutex<VecDeque<Sample>>,
    counters: Counters,
    accepting: std::sync::atomic::AtomicBool,
    space_available: Notify,
    store: Store,
}

impl BufferWriter {
    pub fn new(store: Store, max_size: usize, policy: OverflowPolicy) -> Self {
        Self {
            max_size,
            policy,
            pending: Mutex::new(VecDeque::with_capacity(max_size.min(1024))),
            counters: Counters::default(),
            accepting: std::sync::atomic::AtomicBool::new(true),
            space_available: Notify::new(),
            store,
        }
    }

    pub fn with_defaults(store: Store) -> Self {
        Self::new(store, DEFAULT_BUFFER_MAX_SIZE, OverflowPolicy::DropOldest)
    }

    /// Add one sample, applying the configured overflow policy when full.
    /// Returns `true` if the sample was accepted into the buffer.
    pub async fn add(&self, sample: Sample) -> bool {
        if !self.accepting.load(Ordering::Acquire) {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        loop {
            let outcome = {
                let mut pending = self.pending.lock().expect("buffer mutex poisoned");
                if pending.len() < self.max_size {
                    pending.push_back(sample.clone());
                    Some(true)
                } else {
                    match self.policy {
                        OverflowPolicy::DropNewest => Some(false),
                        OverflowPolicy::DropOldest => {
                            pending.pop_front();
                            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                            pending.push_back(sample.clone());
                            Some(true)
                        }
                        OverflowPolicy::Block => None,
                    }
                }
            };

            match outcome {
                Some(true) => return true,
                Some(false) => {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
                None => {
                    // Block policy: wait for the flusher to free space.
                    self.space_available.notified().await;
                }
            }
        }
    }

    /// Take a consistent snapshot of pending entries, group by table, and
    /// issue one batched insert per table. On failure, re-enqueues
    /// entries that still fit within `max_size` (section 4.3).
    pub fn flush(&self, now: f64) -> Result<usize, BufferError> {
        let snapshot: Vec<Sample> = {
            let mut pending = self.pending.lock().expect("buffer mutex poisoned");
            pending.drain(..).collect()
        };
        self.space_available.notify_waiters();

        if snapshot.is_empty() {
            return Ok(0);
        }

        let mut by_kind: std::collections::HashMap<SampleKind, Vec<Sample>> = std::collections::HashMap::new();
        for sample in snapshot {
            by_kind.entry(sample.kind()).or_default().push(sample);
        }

        let mut written = 0usize;
        let mut failed: Vec<Sample> = Vec::new();
        for (kind, batch) in by_kind {
            match self.store.insert_samples_batch(kind, &batch) {
                Ok(()) => written += batch.len(),
                Err(err) => {
                    tracing::error!(?kind, error = %err, "batch write failed, re-enqueueing");
                    failed.extend(batch);
                }
            }
        }

        if !failed.is_empty() {
            let mut pending = self.pending.lock().expect("buffer mutex poisoned");
            for sample in failed {
                if pending.len() >= self.max_size {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                } else {
                    pending.push_front(sample);
                }
            }
        }

        self.counters.written.fetch_add(written as u64, Ordering::Relaxed);
        self.counters.flush_count.fetch_add(1, Ordering::Relaxed);
        self.counters.last_flush_time_bits.store(now.to_bits(), Ordering::Relaxed);
        Ok(written)
    }

    /// Shutdown drain (section 4.3, section 5): stop accepting new
    /// entries, flush, return.
    pub fn shutdown(&self, now: f64) -> Result<usize, BufferError> {
        self.accepting.store(false, Ordering::Release);
        self.flush(now)
    }

    pub fn stats(&self) -> BufferStats {
        let last_flush_bits = self.counters.last_flush_time_bits.load(Ordering::Relaxed);
        BufferStats {
            received: self.counters.received.load(Ordering::Relaxed),
            written: self.counters.written.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            flush_count: self.counters.flush_count.load(Ordering::Relaxed),
            last_flush_time: if last_flush_bits == 0 { None } else { Some(f64::from_bits(last_flush_bits)) },
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("buffer mutex poisoned").len()
    }

    pub fn should_flush_on_size(&self, size_threshold: usize) -> bool {
        self.pending_len() >= size_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::plc_reading;

    fn sample(i: usize) -> Sample {
        plc_reading("plc-1", i as f64, "thrust_total", i as f64)
    }

    #[tokio::test]
    async fn drop_oldest_keeps_capacity_and_bounds_received_minus_written() {
        let (store, _dir) = Store::temporary();
        let writer = BufferWriter::new(store, 5, OverflowPolicy::DropOldest);
        for i in 0..12 {
            writer.add(sample(i)).await;
        }
        assert_eq!(writer.pending_len(), 5);
        let stats = writer.stats();
        assert_eq!(stats.received, 12);
        assert_eq!(stats.dropped, 7);
        assert!(12 - 5 <= stats.received - stats.dropped);
        assert!(stats.received - stats.dropped <= 12);
    }

    #[tokio::test]
    async fn drop_newest_rejects_when_full() {
        let (store, _dir) = Store::temporary();
        let writer = BufferWriter::new(store, 2, OverflowPolicy::DropNewest);
        assert!(writer.add(sample(0)).await);
        assert!(writer.add(sample(1)).await);
        assert!(!writer.add(sample(2)).await);
        assert_eq!(writer.stats().dropped, 1);
    }

    #[tokio::test]
    async fn flush_writes_all_pending_and_resets_buffer() {
        let (store, _dir) = Store::temporary();
        let writer = BufferWriter::new(store, 100, OverflowPolicy::DropOldest);
        for i in 0..10 {
            writer.add(sample(i)).await;
        }
        let written = writer.flush(1000.0).unwrap();
        assert_eq!(written, 10);
        assert_eq!(writer.pending_len(), 0);
        assert_eq!(writer.stats().written, 10);
        assert_eq!(writer.stats().flush_count, 1);
    }

    #[tokio::test]
    async fn shutdown_stops_accepting_and_flushes() {
        let (store, _dir) = Store::temporary();
        let writer = BufferWriter::new(store, 100, OverflowPolicy::DropOldest);
        writer.add(sample(0)).await;
        writer.shutdown(1.0).unwrap();
        assert_eq!(writer.pending_len(), 0);
        assert!(!writer.add(sample(1)).await);
    }
}
