//! Default in-memory storage backend, grounded on the teacher's
//! `DashMap`-backed `InMemoryStore` (`r2e-cache`). The persistent document
//! store itself is an external collaborator (spec.md §1 Non-goals); this
//! backend is what the dispatcher runs against in tests and is a
//! reasonable default for a single-node deployment.

use crate::store::{BufferedNotification, RequestRecord, Store};
use async_trait::async_trait;
use cse_core::error::{CseError, CseResult};
use cse_model::Resource;
use dashmap::DashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryStore {
    by_ri: DashMap<String, Resource>,
    ri_by_srn: DashMap<String, String>,
    children_by_pi: DashMap<String, Mutex<Vec<String>>>,
    batch_buffers: DashMap<String, Mutex<Vec<BufferedNotification>>>,
    requests: Mutex<Vec<RequestRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_resource(&self, resource: Resource) -> CseResult<()> {
        if self.by_ri.contains_key(&resource.ri) {
            return Err(CseError::conflict(format!(
                "resource '{}' already exists",
                resource.ri
            )));
        }
        if self.ri_by_srn.contains_key(&resource.srn) {
            return Err(CseError::conflict(format!(
                "resource name '{}' already exists under this parent",
                resource.srn
            )));
        }
        self.ri_by_srn.insert(resource.srn.clone(), resource.ri.clone());
        if let Some(pi) = &resource.pi {
            self.children_by_pi
                .entry(pi.clone())
                .or_default()
                .lock()
                .expect("children lock poisoned")
                .push(resource.ri.clone());
        }
        self.by_ri.insert(resource.ri.clone(), resource);
        Ok(())
    }

    async fn update_resource(&self, resource: Resource) -> CseResult<()> {
        if !self.by_ri.contains_key(&resource.ri) {
            return Err(CseError::not_found(format!(
                "resource '{}' does not exist",
                resource.ri
            )));
        }
        self.by_ri.insert(resource.ri.clone(), resource);
        Ok(())
    }

    async fn delete_resource(&self, ri: &str) -> CseResult<Option<Resource>> {
        let Some((_, resource)) = self.by_ri.remove(ri) else {
            return Ok(None);
        };
        self.ri_by_srn.remove(&resource.srn);
        if let Some(pi) = &resource.pi {
            if let Some(siblings) = self.children_by_pi.get(pi) {
                siblings
                    .lock()
                    .expect("children lock poisoned")
                    .retain(|child_ri| child_ri != ri);
            }
        }
        self.children_by_pi.remove(ri);
        self.batch_buffers.remove(ri);
        Ok(Some(resource))
    }

    async fn get_by_ri(&self, ri: &str) -> CseResult<Option<Resource>> {
        Ok(self.by_ri.get(ri).map(|entry| entry.value().clone()))
    }

    async fn get_by_srn(&self, srn: &str) -> CseResult<Option<Resource>> {
        let Some(ri) = self.ri_by_srn.get(srn).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        self.get_by_ri(&ri).await
    }

    async fn children_of(&self, pi: &str) -> CseResult<Vec<Resource>> {
        let Some(child_ris) = self.children_by_pi.get(pi) else {
            return Ok(Vec::new());
        };
        let child_ris = child_ris.lock().expect("children lock poisoned").clone();
        Ok(child_ris
            .into_iter()
            .filter_map(|ri| self.by_ri.get(&ri).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn enqueue_batch_notification(&self, notification: BufferedNotification) -> CseResult<()> {
        self.batch_buffers
            .entry(notification.subscription_ri.clone())
            .or_default()
            .lock()
            .expect("batch buffer lock poisoned")
            .push(notification);
        Ok(())
    }

    async fn drain_batch_notifications(
        &self,
        subscription_ri: &str,
    ) -> CseResult<Vec<BufferedNotification>> {
        let Some(buffer) = self.batch_buffers.get(subscription_ri) else {
            return Ok(Vec::new());
        };
        let mut guard = buffer.lock().expect("batch buffer lock poisoned");
        Ok(std::mem::take(&mut *guard))
    }

    async fn record_request(&self, record: RequestRecord, capacity: usize) -> CseResult<()> {
        let mut requests = self.requests.lock().expect("requests lock poisoned");
        requests.push(record);
        let overflow = requests.len().saturating_sub(capacity);
        if overflow > 0 {
            requests.drain(0..overflow);
        }
        Ok(())
    }

    async fn recent_requests(&self, limit: usize) -> CseResult<Vec<RequestRecord>> {
        let requests = self.requests.lock().expect("requests lock poisoned");
        Ok(requests.iter().rev().take(limit).cloned().collect())
    }

    async fn all_resources(&self) -> CseResult<Vec<Resource>> {
        Ok(self.by_ri.iter().map(|entry| entry.value().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cse_model::ResourceType;

    fn resource(ri: &str, pi: Option<&str>, rn: &str, srn: &str) -> Resource {
        Resource::new(
            ResourceType::Cnt,
            ri.to_string(),
            pi.map(str::to_string),
            rn.to_string(),
            srn.to_string(),
        )
    }

    #[tokio::test]
    async fn insert_then_get_by_ri_and_srn() {
        let store = InMemoryStore::new();
        store
            .insert_resource(resource("ri1", None, "cse-in", "/cse-in"))
            .await
            .unwrap();
        assert!(store.get_by_ri("ri1").await.unwrap().is_some());
        assert!(store.get_by_srn("/cse-in").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_srn_is_rejected() {
        let store = InMemoryStore::new();
        store
            .insert_resource(resource("ri1", None, "cse-in", "/cse-in"))
            .await
            .unwrap();
        let err = store
            .insert_resource(resource("ri2", None, "cse-in", "/cse-in"))
            .await
            .unwrap_err();
        assert_eq!(err.rsc, cse_core::rsc::ResponseStatusCode::Conflict);
    }

    #[tokio::test]
    async fn delete_removes_from_child_index() {
        let store = InMemoryStore::new();
        store
            .insert_resource(resource("ri1", None, "cse-in", "/cse-in"))
            .await
            .unwrap();
        store
            .insert_resource(resource("ri2", Some("ri1"), "cnt1", "/cse-in/cnt1"))
            .await
            .unwrap();
        assert_eq!(store.children_of("ri1").await.unwrap().len(), 1);
        store.delete_resource("ri2").await.unwrap();
        assert_eq!(store.children_of("ri1").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn batch_notifications_drain_clears_buffer() {
        let store = InMemoryStore::new();
        store
            .enqueue_batch_notification(BufferedNotification {
                subscription_ri: "sub1".into(),
                payload: serde_json::json!({"m2m:sgn": {}}),
                enqueued_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        let drained = store.drain_batch_notifications("sub1").await.unwrap();
        assert_eq!(drained.len(), 1);
        assert!(store.drain_batch_notifications("sub1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn request_history_trims_to_capacity() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .record_request(
                    RequestRecord {
                        ri: format!("req{i}"),
                        originator: "Cfoo".into(),
                        operation: cse_model::Operation::Retrieve,
                        target: "/cse-in".into(),
                        rsc: cse_core::rsc::ResponseStatusCode::Ok,
                        timestamp: chrono::Utc::now(),
                    },
                    3,
                )
                .await
                .unwrap();
        }
        let recent = store.recent_requests(10).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].ri, "req4");
    }

    #[tokio::test]
    async fn all_resources_lists_everything_and_filters_by_type() {
        let store = InMemoryStore::new();
        store
            .insert_resource(resource("ri1", None, "cse-in", "/cse-in"))
            .await
            .unwrap();
        store
            .insert_resource(resource("ri2", Some("ri1"), "cnt1", "/cse-in/cnt1"))
            .await
            .unwrap();
        assert_eq!(store.all_resources().await.unwrap().len(), 2);
        let cnts = store.resources_by_type(ResourceType::Cnt).await.unwrap();
        assert_eq!(cnts.len(), 2);
        let acps = store.resources_by_type(ResourceType::Acp).await.unwrap();
        assert!(acps.is_empty());
    }
}
