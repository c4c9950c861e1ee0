//! Resource change events emitted by the dispatcher (§4.1 step 6, §4.3,
//! §4.4, §4.5) and consumed by the notifier, group, and announce
//! components. Each event carries enough context for a subscriber to
//! decide relevance without re-reading storage.

use chrono::{DateTime, Utc};
use cse_model::Resource;

/// A resource was created under `parent_ri` (§4.3 `createDirectChild`).
#[derive(Debug, Clone)]
pub struct ResourceCreated {
    pub resource: Resource,
    pub parent_ri: Option<String>,
}

/// A resource was updated; `previous` is the pre-update snapshot so
/// subscribers can compute `modifiedAttributes` (§4.3).
#[derive(Debug, Clone)]
pub struct ResourceUpdated {
    pub resource: Resource,
    pub previous: Resource,
}

/// A resource was deleted (§4.3 `resourceDelete`/`deleteDirectChild`).
#[derive(Debug, Clone)]
pub struct ResourceDeleted {
    pub resource: Resource,
    pub parent_ri: Option<String>,
}

/// A `<CNT>`/`<TS>` was retrieved while it had zero children, which fires
/// `retrieveCNTNoChild` subscriptions (§4.3).
#[derive(Debug, Clone)]
pub struct ContainerRetrievedWithNoChild {
    pub container_ri: String,
}

/// An `<AE>`'s pending trigger payload arrived (§4.3 `triggerReceivedForAE`).
#[derive(Debug, Clone)]
pub struct TriggerReceivedForAe {
    pub ae_ri: String,
    pub payload: serde_json::Value,
}

/// A `<TS>` detected a gap exceeding `mdt` between consecutive `<TSI>`s
/// (§4.6, reference `TimeSeriesManager`). `resource` is the `<TS>`
/// snapshot with `mdc`/`mdlt` already updated, so the notifier can build
/// `m2m:tsn` content straight from it without a second storage lookup.
#[derive(Debug, Clone)]
pub struct MissingDataDetected {
    pub resource: Resource,
    pub missing_count: u64,
    pub missing_timestamps: Vec<DateTime<Utc>>,
}
