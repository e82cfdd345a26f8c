//! Warning engine orchestrator (section 4.7): evaluates one ring through
//! all seven phases, totally ordered with respect to that ring (section
//! 5: "all phases complete before the next ring is evaluated").
//!
//! Per section 9's re-architecture guidance, external subsystems (e.g.
//! the work-order generator) register via an explicit `on_warnings` hook
//! list rather than the source's monkey-patched `evaluate_ring`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::thresholds::ThresholdCache;
use crate::notification::NotificationRegistry;
use crate::storage::Store;
use crate::types::{RingSummary, Timestamp, WarningEvent, WarningThreshold};

use super::hysteresis::HysteresisTable;
use super::predictive_checker::PredictionSource;
use super::{combiner, predictive_checker, rate_checker, threshold_checker, WarningError};

type WarningHook = Box<dyn Fn(&[WarningEvent]) + Send + Sync>;

pub struct WarningEngine {
    store: Store,
    thresholds: Arc<ThresholdCache>,
    hysteresis: HysteresisTable,
    prediction_source: Arc<dyn PredictionSource>,
    notifications: NotificationRegistry,
    on_warnings: Mutex<Vec<WarningHook>>,
}

impl WarningEngine {
    pub fn new(
        store: Store,
        thresholds: Arc<ThresholdCache>,
        prediction_source: Arc<dyn PredictionSource>,
        notifications: NotificationRegistry,
    ) -> Self {
        Self {
            store,
            thresholds,
            hysteresis: HysteresisTable::new(),
            prediction_source,
            notifications,
            on_warnings: Mutex::new(Vec::new()),
        }
    }

    /// Registers a post-emission hook, invoked with every warning that
    /// survived hysteresis filtering and combination, once per ring
    /// evaluation (section 9).
    pub fn register_on_warnings<F>(&self, hook: F)
    where
        F: Fn(&[WarningEvent]) + Send + Sync + 'static,
    {
        self.on_warnings.lock().expect("on_warnings lock poisoned").push(Box::new(hook));
    }

    /// Runs all seven phases for `summary`, returning the warnings that
    /// survived hysteresis and combination (already persisted and
    /// dispatched). `indicators` is mandatory (section 9's resolved open
    /// question) — the cleanup sweep always has a current-value view.
    pub async fn evaluate_ring(&self, summary: &RingSummary, now: Timestamp) -> Result<Vec<WarningEvent>, WarningError> {
        let zone = summary.geological_zone.clone().unwrap_or_else(|| "all".to_string());
        let indicators = summary.indicator_values();

        let mut candidates = Vec::new();
        let mut thresholds_by_key: HashMap<(String, String), WarningThreshold> = HashMap::new();

        for (name, value) in &indicators {
            let Some(threshold) = self.thresholds.lookup(name, Some(&zone)) else {
                continue;
            };
            thresholds_by_key.insert((name.clone(), zone.clone()), (*threshold).clone());

            // Phase 1 — threshold.
            if let Some(event) = threshold_checker::check(name, *value, &threshold, summary.ring_number, now) {
                candidates.push(event);
            }

            // Phase 2 — rate.
            let historical = self
                .store
                .recent_ring_summaries_before(summary.ring_number, threshold.rate.window_size)?
                .iter()
                .filter_map(|s| s.indicator_values().get(name).copied())
                .collect::<Vec<_>>();
            if let Some(event) = rate_checker::check(name, *value, &historical, &threshold, summary.ring_number, now) {
                candidates.push(event);
            }

            // Phase 3 — predictive.
            if let Some(event) =
                predictive_checker::check(name, self.prediction_source.as_ref(), &threshold, summary.ring_number, now)
            {
                candidates.push(event);
            }
        }

        // Phase 4 — hysteresis filtering.
        let mut active_keys = Vec::new();
        let mut passed = Vec::new();
        for event in candidates {
            let key = (event.indicator_name.clone(), zone.clone());
            let Some(threshold) = thresholds_by_key.get(&key) else {
                continue;
            };
            active_keys.push(key);
            let value = event.indicator_value.or(event.predicted_value).unwrap_or(0.0);
            let threshold_value = event.threshold_value.unwrap_or(0.0);
            let pass = self.hysteresis.filter(
                &event.indicator_name,
                &zone,
                event.warning_level,
                value,
                threshold_value,
                now,
                threshold.hysteresis.percentage,
            );
            if pass {
                passed.push(event);
            }
        }
        self.hysteresis.sweep_cleanup(&active_keys, &indicators, &thresholds_by_key);

        // Phase 5 — combined aggregation.
        if let Some(combined) = combiner::combine(&passed, summary.ring_number, now) {
            passed.push(combined);
        }

        // Phase 6 — persistence. A single event's failure is logged and
        // dropped; it does not block persistence of the remaining events
        // or evaluation of the next ring (section 7).
        for event in &passed {
            if let Err(err) = self.store.append_warning_event(event) {
                tracing::error!(warning_id = %event.warning_id, error = %err, "failed to persist warning event, dropping");
            }
        }

        // Phase 7 — notification dispatch, fire-and-forget.
        for event in &passed {
            self.notifications.dispatch(event).await;
        }

        let hooks = self.on_warnings.lock().expect("on_warnings lock poisoned");
        for hook in hooks.iter() {
            hook(&passed);
        }

        Ok(passed)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}
