//! Retry sub-component (section 4.8, supplemented 2b): per
//! `(warning_id, channel)` task with fixed-schedule exponential backoff
//! `[60s, 300s, 900s]` (index-capped at the last entry beyond the
//! schedule length), bounded `max_attempts`, bounded task age, periodic
//! cleanup of expired tasks, and queue/statistics introspection.

use std::collections::VecDeque;
use std::sync::Mutex;

use uuid::Uuid;

use crate::config::defaults::{DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_RETRY_TASK_MAX_AGE_SECONDS, RETRY_SCHEDULE_SECONDS};
use crate::notification::channels::Channel;
use crate::types::{now, Timestamp};

#[derive(Debug, Clone)]
pub struct RetryTask {
    pub warning_id: Uuid,
    pub channel: Channel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attempts: u32,
    pub created_at: Timestamp,
    pub next_attempt_at: Timestamp,
}

impl RetryTask {
    fn backoff_seconds(attempt_index: usize) -> f64 {
        let idx = attempt_index.min(RETRY_SCHEDULE_SECONDS.len() - 1);
        RETRY_SCHEDULE_SECONDS[idx]
    }
}

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct RetryStats {
    pub queued: usize,
    pub expired: u64,
    pub exhausted: u64,
    pub succeeded: u64,
}

/// Queue of in-flight retry tasks plus running statistics. Tasks whose
/// warning succeeded on first attempt are never enqueued — this manager
/// only ever sees failures (section 4.8).
pub struct RetryManager {
    queue: Mutex<VecDeque<RetryTask>>,
    stats: Mutex<RetryStats>,
    max_attempts: u32,
    max_task_age_seconds: f64,
}

impl RetryManager {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_RETRY_TASK_MAX_AGE_SECONDS)
    }

    pub fn with_limits(max_attempts: u32, max_task_age_seconds: f64) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            stats: Mutex::new(RetryStats::default()),
            max_attempts,
            max_task_age_seconds,
        }
    }

    pub fn enqueue(&self, warning_id: Uuid, channel: Channel, recipient: String, subject: String, body: String) {
        let created_at = now();
        let task = RetryTask {
            warning_id,
            channel,
            recipient,
            subject,
            body,
            attempts: 1,
            created_at,
            next_attempt_at: created_at + RetryTask::backoff_seconds(0),
        };
        self.queue.lock().expect("retry queue lock poisoned").push_back(task);
        self.stats.lock().expect("retry stats lock poisoned").queued += 1;
    }

    /// Drains tasks whose `next_attempt_at` has elapsed, invoking
    /// `send_fn` for each; re-enqueues on failure (unless exhausted),
    /// drops on success. Each task's own re-dispatch is independent of
    /// every other task's — a single stuck channel doesn't block the
    /// queue (section 5's per-task concurrency model, mirrored here at
    /// sub-component scale).
    pub async fn run_due_tasks<F, Fut>(&self, mut send_fn: F)
    where
        F: FnMut(RetryTask) -> Fut,
        Fut: std::future::Future<Output = Result<(), crate::notification::NotificationError>>,
    {
        let due: Vec<RetryTask> = {
            let mut queue = self.queue.lock().expect("retry queue lock poisoned");
            let now_ts = now();
            let mut due = Vec::new();
            let mut remaining = VecDeque::new();
            while let Some(task) = queue.pop_front() {
                if task.next_attempt_at <= now_ts {
                    due.push(task);
                } else {
                    remaining.push_back(task);
                }
            }
            *queue = remaining;
            due
        };

        for mut task in due {
            match send_fn(task.clone()).await {
                Ok(()) => {
                    self.stats.lock().expect("retry stats lock poisoned").succeeded += 1;
                }
                Err(_) if task.attempts >= self.max_attempts => {
                    self.stats.lock().expect("retry stats lock poisoned").exhausted += 1;
                }
                Err(_) => {
                    task.attempts += 1;
                    task.next_attempt_at = now() + RetryTask::backoff_seconds(task.attempts as usize - 1);
                    self.queue.lock().expect("retry queue lock poisoned").push_back(task);
                }
            }
        }
        self.sync_queued_stat();
    }

    /// Periodic cleanup sweep (default interval 3600s, SPEC_FULL 2b):
    /// drops tasks older than `max_task_age_hours`, bumping the `expired`
    /// metric.
    pub fn cleanup_expired(&self) {
        let cutoff = now() - self.max_task_age_seconds;
        let mut queue = self.queue.lock().expect("retry queue lock poisoned");
        let before = queue.len();
        queue.retain(|task| task.created_at >= cutoff);
        let expired = before - queue.len();
        drop(queue);
        if expired > 0 {
            let mut stats = self.stats.lock().expect("retry stats lock poisoned");
            stats.expired += expired as u64;
        }
        self.sync_queued_stat();
    }

    fn sync_queued_stat(&self) {
        let queued = self.queue.lock().expect("retry queue lock poisoned").len();
        self.stats.lock().expect("retry stats lock poisoned").queued = queued;
    }

    pub fn stats(&self) -> RetryStats {
        self.stats.lock().expect("retry stats lock poisoned").clone()
    }

    pub fn clear(&self) {
        self.queue.lock().expect("retry queue lock poisoned").clear();
        self.sync_queued_stat();
    }
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new()
    }
}
