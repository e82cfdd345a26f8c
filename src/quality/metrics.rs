//! Quality metrics tracker (section 4.2): the single source of truth for
//! operational quality observability. Aggregates counts per stage, per
//! tag, and per rule, and computes a per-record quality level. Also
//! exposes the "problematic tags" report and metrics-export operation
//! named as a supplemented feature (SPEC_FULL 2b).
//!
//! Stateless components call into this sink rather than holding their own
//! counters (design note, section 9).

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use super::reasonableness::ReasonablenessRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordQuality {
    High,
    Medium,
    Low,
}

#[derive(Debug, Default)]
struct TagCounters {
    validation_passed: u64,
    validation_failed: u64,
    calibrated: u64,
    interpolated: u64,
    reasonableness_passed: u64,
    reasonableness_failed: u64,
}

#[derive(Debug, Default)]
struct Inner {
    by_tag: HashMap<String, TagCounters>,
    by_rule: HashMap<String, (u64, u64)>, // (passed, failed)
}

/// Thread-shared metrics sink. Cheap to pass by reference since it's
/// internally mutexed; every quality stage takes `&QualityMetrics`.
#[derive(Debug, Default)]
pub struct QualityMetrics {
    inner: Mutex<Inner>,
}

impl QualityMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_validation(&self, tag: &str, passed: bool) {
        let mut inner = self.inner.lock().expect("quality metrics mutex poisoned");
        let counters = inner.by_tag.entry(tag.to_string()).or_default();
        if passed {
            counters.validation_passed += 1;
        } else {
            counters.validation_failed += 1;
        }
    }

    pub fn record_calibration(&self, tag: &str) {
        let mut inner = self.inner.lock().expect("quality metrics mutex poisoned");
        inner.by_tag.entry(tag.to_string()).or_default().calibrated += 1;
    }

    pub fn record_interpolation(&self, tag: &str) {
        let mut inner = self.inner.lock().expect("quality metrics mutex poisoned");
        inner.by_tag.entry(tag.to_string()).or_default().interpolated += 1;
    }

    pub fn record_reasonableness(&self, rule: ReasonablenessRule, passed: bool) {
        let mut inner = self.inner.lock().expect("quality metrics mutex poisoned");
        let entry = inner.by_rule.entry(format!("{rule:?}")).or_insert((0, 0));
        if passed {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    /// Record quality level for one record (section 4.2):
    /// `high` if validation and reasonableness passed and no
    /// interpolation; `medium` if passed but contained interpolation;
    /// `low` if any validation or reasonableness failure.
    pub fn record_quality_level(validation_passed: bool, reasonableness_passed: bool, was_interpolated: bool) -> RecordQuality {
        if !validation_passed || !reasonableness_passed {
            RecordQuality::Low
        } else if was_interpolated {
            RecordQuality::Medium
        } else {
            RecordQuality::High
        }
    }

    /// Tags whose validation-failure rate exceeds `min_failure_rate`,
    /// skipping tags with fewer than `min_samples` observations (too few
    /// to be statistically meaningful). Supplemented feature (SPEC_FULL
    /// 2b).
    pub fn problematic_tags(&self, min_failure_rate: f64, min_samples: u64) -> Vec<ProblematicTag> {
        let inner = self.inner.lock().expect("quality metrics mutex poisoned");
        let mut out = Vec::new();
        for (tag, counters) in &inner.by_tag {
            let total = counters.validation_passed + counters.validation_failed;
            if total < min_samples {
                continue;
            }
            let failure_rate = counters.validation_failed as f64 / total as f64;
            if failure_rate >= min_failure_rate {
                out.push(ProblematicTag { tag_name: tag.clone(), failure_rate, total_samples: total });
            }
        }
        out.sort_by(|a, b| b.failure_rate.partial_cmp(&a.failure_rate).unwrap());
        out
    }

    pub fn export(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().expect("quality metrics mutex poisoned");
        let tags = inner
            .by_tag
            .iter()
            .map(|(tag, c)| {
                (
                    tag.clone(),
                    TagMetrics {
                        validation_passed: c.validation_passed,
                        validation_failed: c.validation_failed,
                        calibrated: c.calibrated,
                        interpolated: c.interpolated,
                        reasonableness_passed: c.reasonableness_passed,
                        reasonableness_failed: c.reasonableness_failed,
                    },
                )
            })
            .collect();
        let rules = inner
            .by_rule
            .iter()
            .map(|(rule, (passed, failed))| (rule.clone(), RuleMetrics { passed: *passed, failed: *failed }))
            .collect();
        MetricsSnapshot { tags, rules }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProblematicTag {
    pub tag_name: String,
    pub failure_rate: f64,
    pub total_samples: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagMetrics {
    pub validation_passed: u64,
    pub validation_failed: u64,
    pub calibrated: u64,
    pub interpolated: u64,
    pub reasonableness_passed: u64,
    pub reasonableness_failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleMetrics {
    pub passed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tags: HashMap<String, TagMetrics>,
    pub rules: HashMap<String, RuleMetrics>,
}
