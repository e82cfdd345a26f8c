//! Work-order generator (section 4.9, supplemented 2b): turns warnings
//! into actionable work orders per a configurable, per-indicator rule
//! table, with at-most-one-order-per-warning deduplication and severity
//! -> priority mapping.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::storage::{Store, StorageError};
use crate::types::{Priority, Timestamp, WarningEvent, WarningLevel, WorkOrder, WorkOrderStatus};

/// Per-indicator generation policy (section 4.9: "ALARM always
/// generates; WARNING configurable per indicator; ATTENTION configurable,
/// default off").
#[derive(Debug, Clone)]
pub struct GenerationRule {
    pub generate_on_warning: bool,
    pub generate_on_attention: bool,
    pub category: String,
    pub verification_required: bool,
    pub verification_ring_count: u32,
}

impl Default for GenerationRule {
    fn default() -> Self {
        Self {
            generate_on_warning: true,
            generate_on_attention: false,
            category: "other".to_string(),
            verification_required: false,
            verification_ring_count: 5,
        }
    }
}

/// The original's hardcoded `DEFAULT_RULES` table, re-expressed against
/// this crate's indicator names.
fn default_rules() -> HashMap<String, GenerationRule> {
    let mut rules = HashMap::new();
    rules.insert(
        "settlement_value".to_string(),
        GenerationRule { category: "settlement".to_string(), verification_required: true, verification_ring_count: 10, ..Default::default() },
    );
    rules.insert(
        "chamber_pressure".to_string(),
        GenerationRule { category: "chamber_pressure".to_string(), verification_required: true, verification_ring_count: 3, ..Default::default() },
    );
    rules.insert("mean_thrust".to_string(), GenerationRule { category: "torque".to_string(), ..Default::default() });
    rules.insert("mean_torque".to_string(), GenerationRule { category: "torque".to_string(), ..Default::default() });
    rules.insert(
        "horizontal_deviation".to_string(),
        GenerationRule { category: "alignment".to_string(), verification_required: true, verification_ring_count: 5, ..Default::default() },
    );
    rules.insert(
        "vertical_deviation".to_string(),
        GenerationRule { category: "alignment".to_string(), verification_required: true, verification_ring_count: 5, ..Default::default() },
    );
    rules
}

fn priority_for(level: WarningLevel) -> Priority {
    match level {
        WarningLevel::Alarm => Priority::Critical,
        WarningLevel::Warning => Priority::High,
        WarningLevel::Attention => Priority::Medium,
    }
}

/// Generates, persists, and tracks work orders from warning events.
/// Registered with the warning engine via
/// [`crate::warning::engine::WarningEngine::register_on_warnings`].
pub struct WorkOrderGenerator {
    store: Store,
    rules: HashMap<String, GenerationRule>,
    generated_warning_ids: Mutex<HashSet<Uuid>>,
}

impl WorkOrderGenerator {
    pub fn new(store: Store) -> Self {
        Self::with_rules(store, default_rules())
    }

    pub fn with_rules(store: Store, rules: HashMap<String, GenerationRule>) -> Self {
        Self { store, rules, generated_warning_ids: Mutex::new(HashSet::new()) }
    }

    fn rule_for(&self, indicator_name: &str) -> GenerationRule {
        self.rules.get(indicator_name).cloned().unwrap_or_default()
    }

    fn should_generate(&self, warning: &WarningEvent) -> bool {
        if warning.warning_level == WarningLevel::Alarm {
            return true;
        }
        let rule = self.rule_for(&warning.indicator_name);
        match warning.warning_level {
            WarningLevel::Warning => rule.generate_on_warning,
            WarningLevel::Attention => rule.generate_on_attention,
            WarningLevel::Alarm => true,
        }
    }

    /// Generates and persists a work order from `warning`, unless one
    /// already exists for its `warning_id` or the rule table suppresses
    /// it (unless `force`). Mirrors the durable duplicate check against
    /// the store in addition to the in-memory fast path, so a restarted
    /// process doesn't re-generate for warnings it already acted on.
    pub fn generate_from_warning(&self, warning: &WarningEvent, force: bool, now: Timestamp) -> Result<Option<WorkOrder>, StorageError> {
        {
            let seen = self.generated_warning_ids.lock().expect("generated_warning_ids lock poisoned");
            if seen.contains(&warning.warning_id) {
                return Ok(None);
            }
        }
        if self.store.find_by_warning_id(warning.warning_id)?.is_some() {
            self.generated_warning_ids.lock().expect("generated_warning_ids lock poisoned").insert(warning.warning_id);
            return Ok(None);
        }
        if !force && !self.should_generate(warning) {
            return Ok(None);
        }

        let rule = self.rule_for(&warning.indicator_name);
        let order = WorkOrder {
            work_order_id: Uuid::new_v4(),
            warning_id: Some(warning.warning_id),
            title: title_for(warning),
            description: description_for(warning),
            category: rule.category,
            priority: priority_for(warning.warning_level),
            ring_number: Some(warning.ring_number),
            indicator_name: Some(warning.indicator_name.clone()),
            status: WorkOrderStatus::Pending,
            verification_required: rule.verification_required,
            verification_ring_count: rule.verification_ring_count,
            created_at: now,
            updated_at: now,
            synced_to_cloud: false,
        };

        self.store.put_work_order(&order)?;
        self.generated_warning_ids.lock().expect("generated_warning_ids lock poisoned").insert(warning.warning_id);
        tracing::info!(work_order_id = %order.work_order_id, warning_id = %warning.warning_id, indicator = %warning.indicator_name, level = ?warning.warning_level, "work order generated");
        Ok(Some(order))
    }

    /// Processes a batch of warnings (the shape the warning engine's
    /// `on_warnings` hook delivers), generating a work order for each
    /// that qualifies.
    pub fn generate_batch(&self, warnings: &[WarningEvent], now: Timestamp) -> Vec<WorkOrder> {
        let mut orders = Vec::new();
        for warning in warnings {
            match self.generate_from_warning(warning, false, now) {
                Ok(Some(order)) => orders.push(order),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(warning_id = %warning.warning_id, error = %err, "failed to generate work order");
                }
            }
        }
        orders
    }

    pub fn clear_tracking(&self) {
        self.generated_warning_ids.lock().expect("generated_warning_ids lock poisoned").clear();
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

fn title_for(warning: &WarningEvent) -> String {
    let indicator_display = warning.indicator_name.replace('_', " ");
    let level = format!("{:?}", warning.warning_level).to_uppercase();
    format!("{level} - {indicator_display} violation on ring {}", warning.ring_number)
}

fn description_for(warning: &WarningEvent) -> String {
    let mut lines = vec![
        format!("Automatic work order generated from a {:?} level warning.", warning.warning_level),
        String::new(),
        format!("Ring number: {}", warning.ring_number),
        format!("Indicator: {}", warning.indicator_name),
    ];
    if let Some(value) = warning.indicator_value {
        lines.push(format!("Current value: {value:.2}"));
    }
    if let Some(threshold) = warning.threshold_value {
        lines.push(format!("Threshold: {threshold:.2}"));
    }
    let warning_time = Utc.timestamp_opt(warning.timestamp as i64, 0).single().map(|t| t.to_rfc3339()).unwrap_or_default();
    lines.push(format!("Warning time: {warning_time}"));
    lines.push(String::new());
    lines.push("Action required:".to_string());
    lines.push("- Investigate the cause of the threshold violation".to_string());
    lines.push("- Assess impact on tunneling operations".to_string());
    lines.push("- Implement corrective measures if needed".to_string());
    lines.push("- Document actions taken for verification".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ThresholdType, WarningStatus, WarningType};

    fn warning(indicator: &str, level: WarningLevel) -> WarningEvent {
        WarningEvent {
            warning_id: Uuid::new_v4(),
            warning_type: WarningType::Threshold,
            warning_level: level,
            ring_number: 12,
            timestamp: 0.0,
            indicator_name: indicator.to_string(),
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
    fn alarm_always_generates() {
        let (store, _dir) = Store::temporary();
        let generator = WorkOrderGenerator::new(store);
        let order = generator.generate_from_warning(&warning("unrecognized_indicator", WarningLevel::Alarm), false, 0.0).unwrap();
        assert!(order.is_some());
        assert_eq!(order.unwrap().priority, Priority::Critical);
    }

    #[test]
    fn attention_is_suppressed_by_default() {
        let (store, _dir) = Store::temporary();
        let generator = WorkOrderGenerator::new(store);
        let order = generator.generate_from_warning(&warning("settlement_value", WarningLevel::Attention), false, 0.0).unwrap();
        assert!(order.is_none());
    }

    #[test]
    fn duplicate_warning_id_is_suppressed() {
        let (store, _dir) = Store::temporary();
        let generator = WorkOrderGenerator::new(store);
        let w = warning("settlement_value", WarningLevel::Warning);
        let first = generator.generate_from_warning(&w, false, 0.0).unwrap();
        assert!(first.is_some());
        let second = generator.generate_from_warning(&w, false, 0.0).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn settlement_rule_requires_verification() {
        let (store, _dir) = Store::temporary();
        let generator = WorkOrderGenerator::new(store);
        let order = generator.generate_from_warning(&warning("settlement_value", WarningLevel::Warning), false, 0.0).unwrap().unwrap();
        assert!(order.verification_required);
        assert_eq!(order.verification_ring_count, 10);
        assert_eq!(order.category, "settlement");
    }

    #[test]
    fn generate_batch_processes_every_qualifying_warning() {
        let (store, _dir) = Store::temporary();
        let generator = WorkOrderGenerator::new(store);
        let warnings = vec![
            warning("settlement_value", WarningLevel::Warning),
            warning("settlement_value", WarningLevel::Attention),
            warning("mean_thrust", WarningLevel::Alarm),
        ];
        let orders = generator.generate_batch(&warnings, 0.0);
        assert_eq!(orders.len(), 2);
    }
}
