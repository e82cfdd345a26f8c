//! Graded routing table (section 4.8): `ATTENTION` -> broadcast only,
//! `WARNING` -> + email, `ALARM` -> + email + SMS. The routing decision
//! itself lives in [`super::NotificationRegistry::dispatch`]; this module
//! holds the message-formatting helpers shared by both channels.

use crate::types::WarningEvent;

/// Plain-text email body summarizing a warning event.
pub fn format_email_body(event: &WarningEvent) -> String {
    let mut lines = vec![
        format!("Warning level: {:?}", event.warning_level),
        format!("Warning type: {:?}", event.warning_type),
        format!("Ring: {}", event.ring_number),
        format!("Indicator: {}", event.indicator_name),
    ];
    if let Some(value) = event.indicator_value {
        lines.push(format!("Observed value: {value}"));
    }
    if let Some(threshold) = event.threshold_value {
        lines.push(format!("Threshold: {threshold}"));
    }
    if !event.combined_indicators.is_empty() {
        lines.push(format!("Combined indicators: {}", event.combined_indicators.join(", ")));
    }
    lines.join("\n")
}

/// `[LEVEL] Ring N: indicator @ value (threshold)`, per section 6's SMS
/// format — truncated to 160 characters by the SMS sink itself.
pub fn format_sms_body(event: &WarningEvent) -> String {
    let level = format!("{:?}", event.warning_level).to_uppercase();
    let value = event.indicator_value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    let threshold = event.threshold_value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    format!("[{level}] Ring {}: {} @ {value} ({threshold})", event.ring_number, event.indicator_name)
}

/// Batch/summary email variant (section 6: "single-message and batch
/// (summary) variants").
pub fn format_batch_summary(events: &[WarningEvent]) -> String {
    let mut lines = vec![format!("{} warnings in this batch:", events.len())];
    for event in events {
        lines.push(format!("- {}", format_sms_body(event)));
    }
    lines.join("\n")
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
            ring_number: 9,
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

    #[test]
    fn sms_body_matches_format() {
        let body = format_sms_body(&event());
        assert_eq!(body, "[ALARM] Ring 9: settlement_value @ 45 (40)");
        assert!(body.len() <= 160);
    }

    #[test]
    fn batch_summary_lists_every_event() {
        let events = vec![event(), event()];
        let summary = format_batch_summary(&events);
        assert!(summary.starts_with("2 warnings"));
    }
}
