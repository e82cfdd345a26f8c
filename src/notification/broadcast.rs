//! In-process broadcast bus (section 4.8, section 6): publishes to
//! `all`, `<level>`, and `ring/<ring_number>` topics, with retained
//! publication on `latest` for the last ring/prediction. An external MQTT
//! broker is out of scope (section 1); this is realized as a
//! `tokio::sync::broadcast` channel per logical topic family plus a
//! retained-value cache for late subscribers.

use std::sync::RwLock;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::types::{RingSummary, WarningEvent};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BroadcastMessage {
    Warning { topic: String, event: WarningEvent },
    Ring { topic: String, summary: RingSummary },
}

/// One broadcast bus per process. Every publish fans out on a single
/// `tokio::sync::broadcast` channel tagged with its topic string (rather
/// than one channel per topic, since topics are dynamic —
/// `ring/<ring_number>` — and unbounded topic cardinality would leak
/// channels).
pub struct BroadcastBus {
    sender: broadcast::Sender<BroadcastMessage>,
    latest_warning: RwLock<Option<WarningEvent>>,
    latest_ring: RwLock<Option<RingSummary>>,
}

impl BroadcastBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, latest_warning: RwLock::new(None), latest_ring: RwLock::new(None) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.sender.subscribe()
    }

    /// Publishes a warning on topics `warnings/all`, `warnings/<level>`,
    /// and `warnings/ring/<n>`, and updates the retained `latest` value.
    pub fn publish_warning(&self, event: &WarningEvent) {
        let level = format!("{:?}", event.warning_level).to_lowercase();
        for topic in [
            "warnings/all".to_string(),
            format!("warnings/{level}"),
            format!("warnings/ring/{}", event.ring_number),
        ] {
            let _ = self.sender.send(BroadcastMessage::Warning { topic, event: event.clone() });
        }
        *self.latest_warning.write().expect("latest_warning lock poisoned") = Some(event.clone());
    }

    /// Publishes a completed ring summary on `rings/new` and
    /// `rings/latest`, retaining it for late subscribers.
    pub fn publish_ring(&self, summary: &RingSummary) {
        for topic in ["rings/new".to_string(), "rings/latest".to_string()] {
            let _ = self.sender.send(BroadcastMessage::Ring { topic, summary: summary.clone() });
        }
        *self.latest_ring.write().expect("latest_ring lock poisoned") = Some(summary.clone());
    }

    pub fn latest_warning(&self) -> Option<WarningEvent> {
        self.latest_warning.read().expect("latest_warning lock poisoned").clone()
    }

    pub fn latest_ring(&self) -> Option<RingSummary> {
        self.latest_ring.read().expect("latest_ring lock poisoned").clone()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ThresholdType, WarningLevel, WarningStatus, WarningType};
    use uuid::Uuid;

    fn event() -> WarningEvent {
        WarningEvent {
            warning_id: Uuid::new_v4(),
            warning_type: WarningType::Threshold,
            warning_level: WarningLevel::Alarm,
            ring_number: 3,
            timestamp: 0.0,
            indicator_name: "settlement_value".into(),
            indicator_value: Some(45.0),
            threshold_value: Some(40.0),
            threshold_type: Some(ThresholdType::Upper),
            rate_of_change: None,
            rate_multiplier: None,
            predicted_value: None,
            prediction_confidence: None,
            prediction_horizon_hours: None,
            combined_indicators: vec![],
            notification_channels: vec![],
            status: WarningStatus::Active,
            created_at: 0.0,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_three_topic_publications() {
        let bus = BroadcastBus::new();
        let mut rx = bus.subscribe();
        bus.publish_warning(&event());

        let mut topics = Vec::new();
        for _ in 0..3 {
            if let Ok(BroadcastMessage::Warning { topic, .. }) = rx.recv().await {
                topics.push(topic);
            }
        }
        assert!(topics.contains(&"warnings/all".to_string()));
        assert!(topics.contains(&"warnings/alarm".to_string()));
        assert!(topics.contains(&"warnings/ring/3".to_string()));
    }

    #[test]
    fn retains_latest_warning_for_late_subscribers() {
        let bus = BroadcastBus::new();
        assert!(bus.latest_warning().is_none());
        bus.publish_warning(&event());
        assert_eq!(bus.latest_warning().unwrap().ring_number, 3);
    }
}
