use serde::{Deserialize, Serialize};

use super::Timestamp;

/// Kind of source a [`Sample`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Plc,
    Attitude,
    Monitoring,
}

/// Quality annotation carried by every sample.
///
/// Invariant: once persisted, a sample's `quality_flag` never downgrades
/// (section 3). Stages only ever move a sample forward in this ordering:
/// `Raw -> Interpolated|Calibrated -> Rejected|Missing` are terminal-ish;
/// callers should treat `Rejected` and `Missing` as sinks that no later
/// stage reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    Raw,
    Interpolated,
    Calibrated,
    Rejected,
    Missing,
}

impl QualityFlag {
    /// Rank used to enforce the "never downgrades" invariant: a higher rank
    /// sample must never be overwritten in storage by a lower-ranked one.
    fn rank(self) -> u8 {
        match self {
            QualityFlag::Raw => 0,
            QualityFlag::Interpolated => 1,
            QualityFlag::Calibrated => 1,
            QualityFlag::Missing => 2,
            QualityFlag::Rejected => 3,
        }
    }

    /// True if `self` would be a downgrade relative to `previous`.
    pub fn is_downgrade_from(self, previous: QualityFlag) -> bool {
        self.rank() < previous.rank()
    }
}

/// Kind-specific payload carried by a [`Sample`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Plc { tag_name: String, value: f64 },
    Attitude {
        pitch: f64,
        roll: f64,
        yaw: f64,
        horizontal_deviation: f64,
        vertical_deviation: f64,
        axis_deviation: f64,
    },
    Monitoring {
        sensor_type: String,
        sensor_location: Option<String>,
        value: f64,
        unit: String,
    },
}

impl Payload {
    pub fn kind(&self) -> SampleKind {
        match self {
            Payload::Plc { .. } => SampleKind::Plc,
            Payload::Attitude { .. } => SampleKind::Attitude,
            Payload::Monitoring { .. } => SampleKind::Monitoring,
        }
    }
}

/// A transient, bounded-lifetime unit of sensor data flowing from a
/// collector through the quality pipeline into the buffer writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub source_id: String,
    pub timestamp: Timestamp,
    pub payload: Payload,
    pub quality_flag: QualityFlag,
    pub ring_number: Option<u64>,
}

impl Sample {
    pub fn new(source_id: impl Into<String>, timestamp: Timestamp, payload: Payload) -> Self {
        Self {
            source_id: source_id.into(),
            timestamp,
            payload,
            quality_flag: QualityFlag::Raw,
            ring_number: None,
        }
    }

    pub fn kind(&self) -> SampleKind {
        self.payload.kind()
    }

    /// Apply a new quality flag, refusing downgrades per the data-model
    /// invariant. Returns `true` if the flag was actually changed.
    pub fn set_quality_flag(&mut self, flag: QualityFlag) -> bool {
        if flag.is_downgrade_from(self.quality_flag) {
            return false;
        }
        self.quality_flag = flag;
        true
    }

    pub fn tag_name(&self) -> Option<&str> {
        match &self.payload {
            Payload::Plc { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match &self.payload {
            Payload::Plc { value, .. } => Some(*value),
            Payload::Monitoring { value, .. } => Some(*value),
            Payload::Attitude { .. } => None,
        }
    }
}

/// Convenience constructor matching the data model's `PlcReading` shape.
pub fn plc_reading(source_id: &str, timestamp: Timestamp, tag_name: &str, value: f64) -> Sample {
    Sample::new(
        source_id,
        timestamp,
        Payload::Plc {
            tag_name: tag_name.to_string(),
            value,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_flag_never_downgrades() {
        let mut s = plc_reading("plc-1", 0.0, "thrust_total", 1000.0);
        assert!(s.set_quality_flag(QualityFlag::Calibrated));
        assert!(!s.set_quality_flag(QualityFlag::Raw));
        assert_eq!(s.quality_flag, QualityFlag::Calibrated);
        assert!(s.set_quality_flag(QualityFlag::Rejected));
        assert!(!s.set_quality_flag(QualityFlag::Interpolated));
        assert_eq!(s.quality_flag, QualityFlag::Rejected);
    }
}
