//! HTTP monitoring collector (section 4.1): per-endpoint polling of a
//! JSON sensor feed with exponential backoff (2^n seconds, capped at
//! 30s) up to `max_retries` before surrendering the current tick.
//!
//! Grounded on the original's `rest_client.py` (GET-and-parse loop,
//! exponential backoff, tolerant list-or-envelope response shape) using
//! `reqwest` for the HTTP client, matching the teacher's choice of async
//! HTTP stack.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;

use crate::config::sources::MonitoringEndpointConfig;
use crate::types::{now, Payload, Sample};

use super::{Collector, CollectorError, CollectorState, CollectorStatus};

const MAX_BACKOFF_SECONDS: u64 = 30;

#[derive(Debug, Deserialize)]
struct SensorItem {
    sensor_type: String,
    #[serde(default)]
    sensor_location: Option<String>,
    value: f64,
    #[serde(default)]
    unit: String,
}

/// The feed may respond with a bare array, or with an envelope object
/// carrying the array under `sensors` or `readings` — both appear across
/// the original's integrations, so both are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MonitoringResponse {
    Items(Vec<SensorItem>),
    Envelope { #[serde(alias = "readings")] sensors: Vec<SensorItem> },
}

impl MonitoringResponse {
    fn into_items(self) -> Vec<SensorItem> {
        match self {
            MonitoringResponse::Items(items) => items,
            MonitoringResponse::Envelope { sensors } => sensors,
        }
    }
}

pub struct HttpMonitoringCollector {
    source_id: String,
    config: MonitoringEndpointConfig,
    client: reqwest::Client,
    state: CollectorState,
}

impl HttpMonitoringCollector {
    pub fn new(config: MonitoringEndpointConfig) -> Self {
        let source_id = format!("monitoring-{}", config.name);
        Self { source_id, config, client: reqwest::Client::new(), state: CollectorState::new() }
    }

    pub fn with_client(config: MonitoringEndpointConfig, client: reqwest::Client) -> Self {
        let source_id = format!("monitoring-{}", config.name);
        Self { source_id, config, client, state: CollectorState::new() }
    }

    async fn fetch(&self) -> Result<Vec<Sample>, CollectorError> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| CollectorError::ConnectionFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| CollectorError::ConnectionFailed(e.to_string()))?;

        let body: MonitoringResponse = response.json().await.map_err(|e| CollectorError::ReadFailed(e.to_string()))?;
        let ts = now();
        let samples = body
            .into_items()
            .into_iter()
            .map(|item| {
                Sample::new(
                    self.source_id.clone(),
                    ts,
                    Payload::Monitoring { sensor_type: item.sensor_type, sensor_location: item.sensor_location, value: item.value, unit: item.unit },
                )
            })
            .collect();
        Ok(samples)
    }

    /// Fetches with exponential backoff, giving up after `max_retries`
    /// attempts within this single poll tick.
    async fn fetch_with_backoff(&self) -> Option<Vec<Sample>> {
        let mut attempt = 0u32;
        loop {
            match self.fetch().await {
                Ok(samples) => return Some(samples),
                Err(err) => {
                    attempt += 1;
                    tracing::warn!(source = %self.source_id, attempt, error = %err, "monitoring poll failed");
                    if attempt >= self.config.max_retries {
                        return None;
                    }
                    let backoff = Duration::from_secs(2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECONDS));
                    tokio::select! {
                        () = self.state.cancel.cancelled() => return None,
                        () = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Collector for HttpMonitoringCollector {
    async fn start(&self, tx: mpsc::Sender<Sample>) {
        self.state.mark_started();
        let interval = Duration::from_secs_f64(self.config.poll_interval_seconds.max(0.001));

        loop {
            tokio::select! {
                () = self.state.cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }

            match self.fetch_with_backoff().await {
                Some(samples) => {
                    self.state.mark_success(now());
                    for sample in samples {
                        if tx.send(sample).await.is_err() {
                            self.state.mark_stopped();
                            return;
                        }
                    }
                }
                None => self.state.mark_connected(false),
            }
        }

        self.state.mark_stopped();
        tracing::info!(source = %self.source_id, "http monitoring collector stopped");
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

    #[test]
    fn accepts_bare_array_response() {
        let body = r#"[{"sensor_type":"temperature","value":21.5,"unit":"c"}]"#;
        let parsed: MonitoringResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_items().len(), 1);
    }

    #[test]
    fn accepts_sensors_envelope_response() {
        let body = r#"{"sensors":[{"sensor_type":"humidity","value":55.0,"unit":"pct"}]}"#;
        let parsed: MonitoringResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_items().len(), 1);
    }

    #[test]
    fn accepts_readings_envelope_response() {
        let body = r#"{"readings":[{"sensor_type":"humidity","value":55.0,"unit":"pct"}]}"#;
        let parsed: MonitoringResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_items().len(), 1);
    }

    #[test]
    fn backoff_caps_at_thirty_seconds() {
        let backoff = |attempt: u32| 2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECONDS);
        assert_eq!(backoff(1), 2);
        assert_eq!(backoff(5), 30);
        assert_eq!(backoff(10), 30);
    }
}
