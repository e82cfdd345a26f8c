//! Tagged `Channel` variants with a uniform `send` contract (section 9:
//! "use a tagged variant `Channel ∈ {Email, SMS, Webhook, Broadcast}` plus
//! a uniform `send(recipient, subject, body, metadata)` contract").
//!
//! Email and SMS transports are out of scope as full production clients
//! (section 1); each sink here implements the formatting and dispatch
//! contract against a pluggable transport trait, so a real SMTP/Twilio
//! client can be substituted without touching the warning engine or
//! router.

use async_trait::async_trait;
use std::collections::HashMap;

use super::NotificationError;
use crate::types::WarningEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
    Webhook,
    Broadcast,
}

/// Structured context handed to a sink alongside the rendered
/// subject/body, so a transport can attach headers or tags without the
/// sink needing to know about [`WarningEvent`] directly.
#[derive(Debug, Clone, Default)]
pub struct Metadata(pub HashMap<String, String>);

impl Metadata {
    pub fn for_warning(event: &WarningEvent) -> Self {
        let mut map = HashMap::new();
        map.insert("warning_id".to_string(), event.warning_id.to_string());
        map.insert("ring_number".to_string(), event.ring_number.to_string());
        map.insert("warning_level".to_string(), format!("{:?}", event.warning_level));
        map.insert("indicator_name".to_string(), event.indicator_name.clone());
        Self(map)
    }
}

/// Uniform send contract shared by every channel sink.
#[async_trait]
pub trait ChannelSink: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str, metadata: &Metadata) -> Result<(), NotificationError>;
}

/// SMTP-shaped email sink (section 6): composes single-message bodies and
/// batch/summary variants, plain-text and HTML. The actual SMTP transport
/// is behind [`EmailTransport`] so a real client can be substituted.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn deliver(&self, recipient: &str, subject: &str, plain_body: &str, html_body: &str) -> Result<(), NotificationError>;
}

pub struct EmailSink<T: EmailTransport> {
    transport: T,
}

impl<T: EmailTransport> EmailSink<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn to_html(plain_body: &str) -> String {
        let escaped = plain_body.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
        format!("<html><body><pre>{escaped}</pre></body></html>")
    }
}

#[async_trait]
impl<T: EmailTransport> ChannelSink for EmailSink<T> {
    async fn send(&self, recipient: &str, subject: &str, body: &str, _metadata: &Metadata) -> Result<(), NotificationError> {
        let html = Self::to_html(body);
        self.transport.deliver(recipient, subject, body, &html).await
    }
}

/// Logs the composed message instead of delivering it — the "minimal
/// real implementation ... sufficient to exercise the `Channel` contract"
/// default transport (section 1).
pub struct LoggingEmailTransport;

#[async_trait]
impl EmailTransport for LoggingEmailTransport {
    async fn deliver(&self, recipient: &str, subject: &str, plain_body: &str, _html_body: &str) -> Result<(), NotificationError> {
        tracing::info!(recipient, subject, body = plain_body, "email dispatched (logging transport)");
        Ok(())
    }
}

/// SMS sink (section 6, section 9): 160-char message formatting is fully
/// implemented here; the transport (Twilio / generic HTTP gateway /
/// serial GSM modem) is pluggable.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), NotificationError>;
}

pub struct SmsSink<T: SmsTransport> {
    transport: T,
}

impl<T: SmsTransport> SmsSink<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Truncates to the 160-character SMS limit, preserving the message
    /// prefix (`[LEVEL] Ring N: indicator @ value (threshold)`) which
    /// carries the actionable content.
    pub fn truncate_160(message: &str) -> String {
        if message.chars().count() <= 160 {
            message.to_string()
        } else {
            message.chars().take(160).collect()
        }
    }
}

#[async_trait]
impl<T: SmsTransport> ChannelSink for SmsSink<T> {
    async fn send(&self, recipient: &str, _subject: &str, body: &str, _metadata: &Metadata) -> Result<(), NotificationError> {
        let message = Self::truncate_160(body);
        self.transport.deliver(recipient, &message).await
    }
}

pub struct LoggingSmsTransport;

#[async_trait]
impl SmsTransport for LoggingSmsTransport {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), NotificationError> {
        tracing::info!(recipient, message, "sms dispatched (logging transport)");
        Ok(())
    }
}

/// Generic HTTP gateway SMS transport (section 6: "a generic HTTP
/// gateway"). Posts `{to, message}` as JSON to a configured endpoint.
pub struct HttpGatewaySmsTransport {
    pub endpoint: String,
    pub client: reqwest::Client,
}

#[async_trait]
impl SmsTransport for HttpGatewaySmsTransport {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "to": recipient, "message": message }))
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotificationError::SendFailed(format!("gateway returned {}", response.status())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_160_chars() {
        let long = "x".repeat(200);
        let truncated = SmsSink::<LoggingSmsTransport>::truncate_160(&long);
        assert_eq!(truncated.chars().count(), 160);
    }

    #[test]
    fn short_message_passes_through_unchanged() {
        let msg = "[ALARM] Ring 12: settlement_value @ 45 (40)";
        assert_eq!(SmsSink::<LoggingSmsTransport>::truncate_160(msg), msg);
    }

    #[tokio::test]
    async fn logging_transport_always_succeeds() {
        let sink = EmailSink::new(LoggingEmailTransport);
        let result = sink.send("ops@example.com", "subject", "body", &Metadata::default()).await;
        assert!(result.is_ok());
    }
}
