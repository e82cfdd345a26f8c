//! Notification router (section 4.8): graded dispatch to configured
//! sinks with retry.
//!
//! Per section 9's re-architecture guidance, channels are a tagged
//! `Channel` enum with a uniform `send` contract rather than
//! runtime-typed adapters, and the router/retry-manager/channel sinks are
//! owned by one [`NotificationRegistry`] constructed at startup and
//! threaded through to callers — replacing the source's process-wide
//! singleton getters (`get_mqtt_publisher`, `get_ring_publisher`, etc.).

pub mod broadcast;
pub mod channels;
pub mod retry;
pub mod router;

use std::sync::Arc;

use crate::types::{WarningEvent, WarningLevel};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("channel send failed: {0}")]
    SendFailed(String),
}

/// Everything a ring/warning pipeline needs to notify the outside world,
/// constructed once at startup and cloned (cheaply — every field is
/// `Arc`-backed) into every task that dispatches notifications.
#[derive(Clone)]
pub struct NotificationRegistry {
    pub broadcast: Arc<broadcast::BroadcastBus>,
    pub email: Arc<dyn channels::ChannelSink>,
    pub sms: Arc<dyn channels::ChannelSink>,
    pub retry: Arc<retry::RetryManager>,
}

impl NotificationRegistry {
    pub fn new(email: Arc<dyn channels::ChannelSink>, sms: Arc<dyn channels::ChannelSink>) -> Self {
        Self {
            broadcast: Arc::new(broadcast::BroadcastBus::new()),
            email,
            sms,
            retry: Arc::new(retry::RetryManager::new()),
        }
    }

    /// Builds the recipient set from a warning's own `notification_channels`
    /// (carrying `tier_channels` resolved at threshold-config time) and
    /// dispatches per the graded routing table in section 4.8:
    /// `ATTENTION` -> broadcast only, `WARNING` -> + email, `ALARM` -> +
    /// SMS. Fire-and-forget: failures are retried asynchronously by the
    /// retry manager and never block warning generation (section 4.7
    /// phase 7, section 7: "Warning dispatch is fire-and-forget").
    pub async fn dispatch(&self, event: &WarningEvent) {
        self.broadcast.publish_warning(event);

        if event.notification_channels.is_empty() {
            return;
        }

        let subject = format!("[{:?}] Ring {} — {}", event.warning_level, event.ring_number, event.indicator_name);
        let body = router::format_email_body(event);

        match event.warning_level {
            WarningLevel::Attention => {}
            WarningLevel::Warning => {
                self.send_and_enqueue_retry(event, channels::Channel::Email, &subject, &body).await;
            }
            WarningLevel::Alarm => {
                self.send_and_enqueue_retry(event, channels::Channel::Email, &subject, &body).await;
                let sms_body = router::format_sms_body(event);
                self.send_and_enqueue_retry(event, channels::Channel::Sms, &subject, &sms_body).await;
            }
        }
    }

    async fn send_and_enqueue_retry(&self, event: &WarningEvent, channel: channels::Channel, subject: &str, body: &str) {
        let sink: &Arc<dyn channels::ChannelSink> = match channel {
            channels::Channel::Email => &self.email,
            channels::Channel::Sms => &self.sms,
            _ => return,
        };
        for recipient in &event.notification_channels {
            let result = sink
                .send(recipient, subject, body, &channels::Metadata::for_warning(event))
                .await;
            if let Err(err) = result {
                tracing::warn!(warning_id = %event.warning_id, %recipient, channel = ?channel, error = %err, "notification send failed, enqueuing retry");
                self.retry.enqueue(event.warning_id, channel, recipient.clone(), subject.to_string(), body.to_string());
            }
        }
    }
}
