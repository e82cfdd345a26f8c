//! Guidance polling collector (section 4.1): fixed-interval register
//! reads interpreted per-field as int16/uint16/int32/float32 big-endian,
//! assembled into one attitude sample per completed poll.
//!
//! Grounded on the original's `modbus_client.py` (register-group polling,
//! big-endian word decode, default 1s interval) and the shared
//! `RegisterGroup` schema in [`crate::config::sources`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::sources::{GuidanceSourceConfig, RegisterGroup, RegisterType};
use crate::types::{now, Payload, Sample};

use super::{Collector, CollectorError, CollectorState, CollectorStatus};

/// Transport abstraction over the register-read protocol (Modbus or
/// vendor-specific equivalent). Returns the raw register words for
/// `group`, already byte-order-normalized to the host's native endianness
/// by the caller's decode step.
#[async_trait]
pub trait RegisterTransport: Send + Sync {
    async fn connect(&self) -> Result<(), CollectorError>;
    async fn read_group(&self, group: &RegisterGroup) -> Result<Vec<u8>, CollectorError>;
}

/// Decodes a register's raw big-endian bytes per its declared type.
/// Required fields this fails for are skipped, not substituted with a
/// default — the caller decides whether a partial poll still emits.
fn decode(register_type: RegisterType, bytes: &[u8]) -> Option<f64> {
    match register_type {
        RegisterType::Int16 => {
            let arr: [u8; 2] = bytes.get(0..2)?.try_into().ok()?;
            Some(i16::from_be_bytes(arr) as f64)
        }
        RegisterType::Uint16 => {
            let arr: [u8; 2] = bytes.get(0..2)?.try_into().ok()?;
            Some(u16::from_be_bytes(arr) as f64)
        }
        RegisterType::Int32 => {
            let arr: [u8; 4] = bytes.get(0..4)?.try_into().ok()?;
            Some(i32::from_be_bytes(arr) as f64)
        }
        RegisterType::Float32 => {
            let arr: [u8; 4] = bytes.get(0..4)?.try_into().ok()?;
            Some(f32::from_be_bytes(arr) as f64)
        }
    }
}

const REQUIRED_FIELDS: &[&str] = &["pitch", "roll", "yaw", "horizontal_deviation", "vertical_deviation", "axis_deviation"];

pub struct GuidancePollingCollector<T: RegisterTransport> {
    source_id: String,
    config: GuidanceSourceConfig,
    transport: T,
    state: CollectorState,
}

impl<T: RegisterTransport> GuidancePollingCollector<T> {
    pub fn new(source_id: impl Into<String>, config: GuidanceSourceConfig, transport: T) -> Self {
        Self { source_id: source_id.into(), config, transport, state: CollectorState::new() }
    }

    async fn poll_once(&self) -> Option<Sample> {
        let mut fields: HashMap<String, f64> = HashMap::new();
        for group in &self.config.registers {
            match self.transport.read_group(group).await {
                Ok(bytes) => match decode(group.register_type, &bytes) {
                    Some(value) => {
                        fields.insert(group.field.clone(), value);
                    }
                    None => tracing::warn!(source = %self.source_id, field = %group.field, "register decode failed"),
                },
                Err(err) => tracing::warn!(source = %self.source_id, field = %group.field, error = %err, "register read failed"),
            }
        }

        if REQUIRED_FIELDS.iter().any(|f| !fields.contains_key(*f)) {
            tracing::warn!(source = %self.source_id, "incomplete guidance poll, skipping sample");
            return None;
        }

        let ts = now();
        let payload = Payload::Attitude {
            pitch: fields["pitch"],
            roll: fields["roll"],
            yaw: fields["yaw"],
            horizontal_deviation: fields["horizontal_deviation"],
            vertical_deviation: fields["vertical_deviation"],
            axis_deviation: fields["axis_deviation"],
        };
        Some(Sample::new(self.source_id.clone(), ts, payload))
    }
}

#[async_trait]
impl<T: RegisterTransport> Collector for GuidancePollingCollector<T> {
    async fn start(&self, tx: mpsc::Sender<Sample>) {
        self.state.mark_started();
        let interval = Duration::from_secs_f64(self.config.poll_interval_seconds.max(0.001));

        if self.transport.connect().await.is_ok() {
            self.state.mark_connected(true);
        } else {
            self.state.mark_connected(false);
        }

        loop {
            tokio::select! {
                () = self.state.cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }

            match self.poll_once().await {
                Some(sample) => {
                    self.state.mark_success(sample.timestamp);
                    if tx.send(sample).await.is_err() {
                        break;
                    }
                }
                None => self.state.mark_connected(false),
            }
        }

        self.state.mark_stopped();
        tracing::info!(source = %self.source_id, "guidance polling collector stopped");
    }

    fn stop(&self) {
        self.state.stop();
    }

    fn status(&self) -> CollectorStatus {
        self.state.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    struct FixedTransport;

    #[async_trait]
    impl RegisterTransport for FixedTransport {
        async fn connect(&self) -> Result<(), CollectorError> {
            Ok(())
        }

        async fn read_group(&self, group: &RegisterGroup) -> Result<Vec<u8>, CollectorError> {
            match group.register_type {
                RegisterType::Float32 => Ok(1.5f32.to_be_bytes().to_vec()),
                RegisterType::Int32 => Ok(42i32.to_be_bytes().to_vec()),
                RegisterType::Int16 => Ok((-3i16).to_be_bytes().to_vec()),
                RegisterType::Uint16 => Ok(7u16.to_be_bytes().to_vec()),
            }
        }
    }

    fn groups() -> Vec<RegisterGroup> {
        REQUIRED_FIELDS
            .iter()
            .enumerate()
            .map(|(i, field)| RegisterGroup { field: field.to_string(), address: i as u16, register_type: RegisterType::Float32 })
            .collect()
    }

    #[test]
    fn decode_matches_big_endian_types() {
        assert_eq!(decode(RegisterType::Int16, &(-3i16).to_be_bytes()), Some(-3.0));
        assert_eq!(decode(RegisterType::Uint16, &7u16.to_be_bytes()), Some(7.0));
        assert_eq!(decode(RegisterType::Int32, &42i32.to_be_bytes()), Some(42.0));
        assert_eq!(decode(RegisterType::Float32, &1.5f32.to_be_bytes()), Some(1.5));
    }

    #[tokio::test]
    async fn emits_attitude_sample_once_per_tick() {
        let config = GuidanceSourceConfig { endpoint: "modbus://guidance".into(), poll_interval_seconds: 0.01, registers: groups() };
        let collector = Arc::new(GuidancePollingCollector::new("guidance-1", config, FixedTransport));
        let (tx, mut rx) = mpsc::channel(8);

        let runner = collector.clone();
        let handle = tokio::spawn(async move { runner.start(tx).await });

        let sample = tokio::time::timeout(StdDuration::from_secs(1), rx.recv()).await.expect("sample received").expect("channel open");
        match sample.payload {
            Payload::Attitude { pitch, .. } => assert_eq!(pitch, 1.5),
            _ => panic!("expected attitude payload"),
        }

        collector.stop();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn missing_required_field_skips_sample() {
        struct Partial;
        #[async_trait]
        impl RegisterTransport for Partial {
            async fn connect(&self) -> Result<(), CollectorError> {
                Ok(())
            }
            async fn read_group(&self, _group: &RegisterGroup) -> Result<Vec<u8>, CollectorError> {
                Err(CollectorError::ReadFailed("timeout".into()))
            }
        }
        let config = GuidanceSourceConfig { endpoint: "modbus://guidance".into(), poll_interval_seconds: 0.01, registers: groups() };
        let collector = GuidancePollingCollector::new("guidance-1", config, Partial);
        assert!(collector.poll_once().await.is_none());
    }
}
