//! `work_orders` table, plus the lifecycle queries named in SPEC_FULL 2b
//! (pending-sync listing, mark-synced, get-by-id, status-filtered listing,
//! aggregate stats) re-expressed atop `sled` rather than SQL.

use super::{Store, StorageResult};
use crate::types::{WorkOrder, WorkOrderStatus};
use uuid::Uuid;

impl Store {
    pub fn put_work_order(&self, order: &WorkOrder) -> StorageResult<()> {
        let key = order.work_order_id.as_bytes();
        self.work_orders.insert(key, serde_json::to_vec(order)?)?;
        Ok(())
    }

    pub fn get_work_order(&self, id: Uuid) -> StorageResult<Option<WorkOrder>> {
        match self.work_orders.get(id.as_bytes())? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    /// At-most-one work order per warning id unless forced (section 3):
    /// callers check this before generating.
    pub fn find_by_warning_id(&self, warning_id: Uuid) -> StorageResult<Option<WorkOrder>> {
        for item in self.work_orders.iter() {
            let (_, v) = item?;
            let order: WorkOrder = serde_json::from_slice(&v)?;
            if order.warning_id == Some(warning_id) {
                return Ok(Some(order));
            }
        }
        Ok(None)
    }

    pub fn list_work_orders(&self, status: Option<WorkOrderStatus>) -> StorageResult<Vec<WorkOrder>> {
        let mut out = Vec::new();
        for item in self.work_orders.iter() {
            let (_, v) = item?;
            let order: WorkOrder = serde_json::from_slice(&v)?;
            if status.map_or(true, |s| order.status == s) {
                out.push(order);
            }
        }
        Ok(out)
    }

    pub fn list_pending_sync_work_orders(&self) -> StorageResult<Vec<WorkOrder>> {
        let mut out = Vec::new();
        for item in self.work_orders.iter() {
            let (_, v) = item?;
            let order: WorkOrder = serde_json::from_slice(&v)?;
            if !order.synced_to_cloud {
                out.push(order);
            }
        }
        Ok(out)
    }

    pub fn mark_work_order_synced(&self, id: Uuid, at: f64) -> StorageResult<()> {
        if let Some(mut order) = self.get_work_order(id)? {
            order.synced_to_cloud = true;
            order.updated_at = at;
            self.put_work_order(&order)?;
            Ok(())
        } else {
            Err(super::StorageError::NotFound)
        }
    }

    pub fn work_order_stats(&self) -> StorageResult<WorkOrderStats> {
        let mut stats = WorkOrderStats::default();
        for item in self.work_orders.iter() {
            let (_, v) = item?;
            let order: WorkOrder = serde_json::from_slice(&v)?;
            stats.total += 1;
            match order.status {
                WorkOrderStatus::Pending => stats.pending += 1,
                WorkOrderStatus::InProgress => stats.in_progress += 1,
                WorkOrderStatus::Completed => stats.completed += 1,
            }
            if !order.synced_to_cloud {
                stats.pending_sync += 1;
            }
        }
        Ok(stats)
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct WorkOrderStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub pending_sync: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;

    fn order(warning_id: Option<Uuid>) -> WorkOrder {
        WorkOrder {
            work_order_id: Uuid::new_v4(),
            warning_id,
            title: "Inspect settlement markers".into(),
            description: "desc".into(),
            category: "settlement".into(),
            priority: Priority::High,
            ring_number: Some(1),
            indicator_name: Some("settlement_value".into()),
            status: WorkOrderStatus::Pending,
            verification_required: true,
            verification_ring_count: 3,
            created_at: 0.0,
            updated_at: 0.0,
            synced_to_cloud: false,
        }
    }

    #[test]
    fn at_most_one_per_warning() {
        let (store, _dir) = Store::temporary();
        let warning_id = Uuid::new_v4();
        store.put_work_order(&order(Some(warning_id))).unwrap();
        assert!(store.find_by_warning_id(warning_id).unwrap().is_some());
        assert!(store.find_by_warning_id(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn mark_synced_updates_flag() {
        let (store, _dir) = Store::temporary();
        let o = order(None);
        store.put_work_order(&o).unwrap();
        store.mark_work_order_synced(o.work_order_id, 5.0).unwrap();
        let found = store.get_work_order(o.work_order_id).unwrap().unwrap();
        assert!(found.synced_to_cloud);
    }
}
