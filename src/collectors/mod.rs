//! Collectors (section 4.1): independent producers that emit [`Sample`]s
//! onto a single bounded channel consumed by the quality pipeline.
//!
//! Per section 9's re-architecture guidance, collectors are modelled as a
//! `Collector` capability trait (`start`/`stop`/`status`) with one
//! concrete type per protocol variant, rather than a single generic
//! adapter — mirroring the reference's `SensorSource` trait
//! (`examples/ashton-dyke-SAIREN-OS/src/acquisition/mod.rs`) generalized
//! to three distinct wire protocols instead of one.

pub mod http_polling;
pub mod polling;
pub mod subscription;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::types::{Sample, Timestamp};

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("read failed: {0}")]
    ReadFailed(String),
}

/// Shared status view (section 4.1: "{running, connected,
/// last_success_time}").
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CollectorStatus {
    pub running: bool,
    pub connected: bool,
    pub last_success_time: Option<Timestamp>,
}

/// Capability trait implemented by each protocol-specific collector.
/// `start` runs the collector's acquisition loop until `stop` is called
/// or the channel receiver is dropped, pushing samples onto `tx`.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn start(&self, tx: mpsc::Sender<Sample>);
    fn stop(&self);
    fn status(&self) -> CollectorStatus;
}

/// Shared bookkeeping every collector variant embeds: a cancellation
/// token honored within one poll interval (section 4.1, section 5), plus
/// the `{running, connected, last_success_time}` status fields.
pub(crate) struct CollectorState {
    pub cancel: CancellationToken,
    running: AtomicBool,
    connected: AtomicBool,
    last_success_time: Mutex<Option<Timestamp>>,
}

impl CollectorState {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            running: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            last_success_time: Mutex::new(None),
        }
    }

    pub fn mark_started(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn mark_stopped(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn mark_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn mark_success(&self, at: Timestamp) {
        self.connected.store(true, Ordering::SeqCst);
        *self.last_success_time.lock().expect("collector state lock poisoned") = Some(at);
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn status(&self) -> CollectorStatus {
        CollectorStatus {
            running: self.running.load(Ordering::SeqCst),
            connected: self.connected.load(Ordering::SeqCst),
            last_success_time: *self.last_success_time.lock().expect("collector state lock poisoned"),
        }
    }
}
