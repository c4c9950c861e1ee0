//! The storage abstraction (§4, §9 design note: the storage layer is the
//! single authority for resource state). Modeled on the teacher's
//! `Repository<T, ID>` trait (`r2e-data`), generalized to the handful of
//! document tables the CSE actually needs: resources, identifiers,
//! child-index, subscriptions, batch-notification buffers, actions,
//! request history, and schedules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cse_core::error::CseResult;
use cse_model::{Resource, ResourceType};
use serde_json::Value;

/// A single buffered notification waiting to be flushed as part of a batch
/// (`<sub>` `bn`, §4.3).
#[derive(Debug, Clone)]
pub struct BufferedNotification {
    pub subscription_ri: String,
    pub payload: Value,
    pub enqueued_at: DateTime<Utc>,
}

/// A recorded `<request>` (§A.2/§A.5 of SPEC_FULL.md: capped request
/// history table).
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub ri: String,
    pub originator: String,
    pub operation: cse_model::Operation,
    pub target: String,
    pub rsc: cse_core::rsc::ResponseStatusCode,
    pub timestamp: DateTime<Utc>,
}

/// The storage authority the dispatcher, notifier, group, and announce
/// components all go through (§9 design note). All operations are
/// transactional at the level of a single resource: the resource table,
/// child index, and identifier index are updated together (§4.1 step 6).
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new resource, updating the identifier and child indices.
    /// Fails with a conflict if `ri` or `srn` is already taken.
    async fn insert_resource(&self, resource: Resource) -> CseResult<()>;

    /// Replace an existing resource in place (same `ri`).
    async fn update_resource(&self, resource: Resource) -> CseResult<()>;

    /// Remove a resource and its index entries. Does not cascade to
    /// children; the dispatcher walks the subtree and deletes bottom-up
    /// (§4.1 step 6 delete branch).
    async fn delete_resource(&self, ri: &str) -> CseResult<Option<Resource>>;

    async fn get_by_ri(&self, ri: &str) -> CseResult<Option<Resource>>;
    async fn get_by_srn(&self, srn: &str) -> CseResult<Option<Resource>>;

    /// Direct children of `pi`, in creation order.
    async fn children_of(&self, pi: &str) -> CseResult<Vec<Resource>>;

    /// Resolve a structured or unstructured resource identifier to its
    /// `ri` (§4.1 step 2).
    async fn resolve(&self, identifier: &str) -> CseResult<Option<String>> {
        if let Some(resource) = self.get_by_ri(identifier).await? {
            return Ok(Some(resource.ri));
        }
        Ok(self
            .get_by_srn(identifier)
            .await?
            .map(|resource| resource.ri))
    }

    /// Enqueue a notification into a subscription's batch buffer (§4.3).
    async fn enqueue_batch_notification(&self, notification: BufferedNotification) -> CseResult<()>;

    /// Drain and return all buffered notifications for a subscription,
    /// atomically clearing the buffer (§4.3 `bn` flush).
    async fn drain_batch_notifications(
        &self,
        subscription_ri: &str,
    ) -> CseResult<Vec<BufferedNotification>>;

    /// Append a request record, trimming the table to the configured
    /// capacity (§A.2 of SPEC_FULL.md).
    async fn record_request(&self, record: RequestRecord, capacity: usize) -> CseResult<()>;

    async fn recent_requests(&self, limit: usize) -> CseResult<Vec<RequestRecord>>;

    /// Every resource currently stored, in no particular order. Backs the
    /// background scanners (expiry sweep, `<TS>` missing-data monitor,
    /// `<TSB>` beacon, `<ACTR>`/`<DEPR>` evaluation loop, §B of
    /// SPEC_FULL.md) that need to enumerate resources rather than walk
    /// from a known parent.
    async fn all_resources(&self) -> CseResult<Vec<Resource>>;

    /// Convenience filter over [`Store::all_resources`] for scanners that
    /// only care about one resource type.
    async fn resources_by_type(&self, ty: ResourceType) -> CseResult<Vec<Resource>> {
        Ok(self
            .all_resources()
            .await?
            .into_iter()
            .filter(|r| r.ty == ty)
            .collect())
    }
}
