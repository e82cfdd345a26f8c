use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub work_order_id: Uuid,
    pub warning_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub ring_number: Option<u64>,
    pub indicator_name: Option<String>,
    pub status: WorkOrderStatus,
    pub verification_required: bool,
    pub verification_ring_count: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub synced_to_cloud: bool,
}
