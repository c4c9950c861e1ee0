//! Subscription lifecycle and event-driven notification delivery
//! (reference: `NotificationManager.addSubscription`/`removeSubscription`/
//! `checkSubscriptions`/`_handleSubscriptionNotification`). Wires the
//! event bus, the subscription registry, the matcher, and the batch
//! coordinator together; the dispatcher calls the lifecycle methods
//! directly and otherwise only needs to have subscribed this notifier's
//! event handlers once at startup.

use crate::batch::BatchCoordinator;
use crate::matcher::{matches, MatchInput};
use crate::registry::SubscriptionRegistry;
use crate::sender::{DeliveryOutcome, NotificationSender};
use crate::subscription::SubscriptionConfig;
use cse_core::error::{CseError, CseResult};
use cse_events::{EventBus, MissingDataDetected, ResourceCreated, ResourceDeleted, ResourceUpdated};
use cse_model::{NotificationContentType, NotificationEventType, Resource};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct Notifier {
    registry: SubscriptionRegistry,
    sender: Arc<dyn NotificationSender>,
    batch: BatchCoordinator,
}

impl Notifier {
    pub fn new(registry: SubscriptionRegistry, sender: Arc<dyn NotificationSender>, batch: BatchCoordinator) -> Self {
        Self { registry, sender, batch }
    }

    /// Register event-bus handlers for the three storage-mutation events
    /// the dispatcher emits after every successful write (§4.1 step 6).
    /// Call once at startup with a `Notifier` wrapped in an `Arc`.
    pub async fn install(self: &Arc<Self>, bus: &EventBus) {
        let this = self.clone();
        bus.subscribe(move |event: Arc<ResourceCreated>| {
            let this = this.clone();
            async move { this.on_created(&event).await }
        })
        .await;

        let this = self.clone();
        bus.subscribe(move |event: Arc<ResourceUpdated>| {
            let this = this.clone();
            async move { this.on_updated(&event).await }
        })
        .await;

        let this = self.clone();
        bus.subscribe(move |event: Arc<ResourceDeleted>| {
            let this = this.clone();
            async move { this.on_deleted(&event).await }
        })
        .await;

        let this = self.clone();
        bus.subscribe(move |event: Arc<MissingDataDetected>| {
            let this = this.clone();
            async move { this.on_missing_data(&event).await }
        })
        .await;
    }

    /// The lowest `mdn` (missingDataMaxNr) across subscriptions on
    /// `ts_ri` watching `ReportOnGeneratedMissingDataPoints`, if any such
    /// subscription exists. The `<TS>` monitor uses this to decide when
    /// its accumulated `mdc` is enough to fire.
    pub fn missing_data_threshold(&self, ts_ri: &str) -> Option<u64> {
        self.registry
            .for_parent(ts_ri)
            .into_iter()
            .filter(|sub| sub.wants_event(NotificationEventType::ReportOnGeneratedMissingDataPoints))
            .filter_map(|sub| sub.missing_data_threshold)
            .min()
    }

    /// Register a subscription after its verification handshake succeeds
    /// (reference: `addSubscription`, which refuses to store the `<sub>`
    /// at all if any `nu` entry fails verification). Returns the error the
    /// dispatcher should fail resource creation with if verification
    /// fails for any notification URI.
    pub async fn register(&self, resource: &Resource) -> CseResult<()> {
        let config = SubscriptionConfig::from_resource(resource)
            .ok_or_else(|| CseError::bad_request("subscription is missing required attributes"))?;

        for uri in &config.notification_uris {
            self.verify(uri, &config.ri).await?;
        }

        self.registry.insert(config);
        Ok(())
    }

    pub async fn reregister(&self, resource: &Resource) -> CseResult<()> {
        let config = SubscriptionConfig::from_resource(resource)
            .ok_or_else(|| CseError::bad_request("subscription is missing required attributes"))?;
        self.registry.replace(config);
        Ok(())
    }

    /// Flush any pending batch and send a `sud` deletion notification to
    /// every subscriber before dropping the subscription from the registry
    /// (reference: `removeSubscription`).
    pub async fn unregister(&self, subscription_ri: &str) -> CseResult<()> {
        self.batch.flush(subscription_ri).await?;
        if let Some(config) = self.registry.remove(subscription_ri) {
            let envelope = json!({ "m2m:sgn": { "sud": true, "sur": config.ri } });
            for uri in &config.notification_uris {
                let _ = self.sender.send(uri, &envelope).await;
            }
        }
        Ok(())
    }

    /// Run the `blockingUpdate` handshake (§4.3): before the dispatcher
    /// commits an update, every subscription hosted on `resource` watching
    /// `net=[blockingUpdate]` must accept the notification synchronously.
    pub async fn check_blocking_update(&self, resource: &Resource) -> CseResult<()> {
        self.check_blocking(resource, NotificationEventType::BlockingUpdate).await
    }

    /// Run the `blockingRetrieve`/`blockingRetrieveDirectChild` handshake
    /// (§4.3): called by the dispatcher before returning a retrieve whose
    /// `lt` is older than the applicable max-age.
    pub async fn check_blocking_retrieve(&self, resource: &Resource, direct_child: bool) -> CseResult<()> {
        let reason = if direct_child {
            NotificationEventType::BlockingRetrieveDirectChild
        } else {
            NotificationEventType::BlockingRetrieve
        };
        self.check_blocking(resource, reason).await
    }

    async fn check_blocking(&self, resource: &Resource, reason: NotificationEventType) -> CseResult<()> {
        for sub in self.registry.for_parent(&resource.ri) {
            if !sub.wants_event(reason) {
                continue;
            }
            let payload = build_signal(&sub, resource, reason);
            for uri in &sub.notification_uris {
                match self.sender.send(uri, &payload).await? {
                    DeliveryOutcome::Delivered => {}
                    DeliveryOutcome::TargetNotReachable => {
                        return Err(CseError::new(
                            cse_core::rsc::ResponseStatusCode::RemoteEntityNotReachable,
                            format!("blocking notification target '{uri}' not reachable"),
                        ));
                    }
                    DeliveryOutcome::OperationNotAllowed => {
                        return Err(CseError::new(
                            cse_core::rsc::ResponseStatusCode::OperationDeniedByRemoteEntity,
                            format!("blocking notification denied by '{uri}'"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    async fn verify(&self, uri: &str, subscription_ri: &str) -> CseResult<()> {
        let envelope = json!({ "m2m:sgn": { "vrq": true, "sur": subscription_ri } });
        match self.sender.send(uri, &envelope).await? {
            DeliveryOutcome::Delivered => Ok(()),
            _ => Err(CseError::bad_request(format!("notification URI '{uri}' failed verification"))),
        }
    }

    async fn on_created(&self, event: &ResourceCreated) {
        if event.resource.is_virtual() {
            return;
        }
        let Some(parent_ri) = &event.parent_ri else {
            return;
        };
        let input = MatchInput {
            resource: &event.resource,
            reason: NotificationEventType::CreateDirectChild,
            modified_attributes: None,
            child_ri: Some(&event.resource.ri),
            missing_data_count: None,
        };
        self.dispatch(parent_ri, &event.resource, &input).await;
    }

    async fn on_updated(&self, event: &ResourceUpdated) {
        if event.resource.is_virtual() {
            return;
        }
        let modified = event.resource.diff_attribute_names(&event.previous);
        let input = MatchInput {
            resource: &event.resource,
            reason: NotificationEventType::ResourceUpdate,
            modified_attributes: Some(&modified),
            child_ri: None,
            missing_data_count: None,
        };
        self.dispatch(&event.resource.ri, &event.resource, &input).await;
    }

    async fn on_deleted(&self, event: &ResourceDeleted) {
        if event.resource.is_virtual() {
            return;
        }
        let input = MatchInput {
            resource: &event.resource,
            reason: NotificationEventType::ResourceDelete,
            modified_attributes: None,
            child_ri: None,
            missing_data_count: None,
        };
        self.dispatch(&event.resource.ri, &event.resource, &input).await;

        if let Some(parent_ri) = &event.parent_ri {
            let child_input = MatchInput {
                resource: &event.resource,
                reason: NotificationEventType::DeleteDirectChild,
                modified_attributes: None,
                child_ri: Some(&event.resource.ri),
                missing_data_count: None,
            };
            self.dispatch(parent_ri, &event.resource, &child_input).await;
        }
    }

    /// The `<TS>` monitor (cse-server) already accumulated `mdc`/`mdlt` on
    /// `event.resource` and decided the threshold is met; just route the
    /// notification to every matching subscription (reference:
    /// `TimeSeriesManager.notifySubscriber`).
    async fn on_missing_data(&self, event: &MissingDataDetected) {
        let input = MatchInput {
            resource: &event.resource,
            reason: NotificationEventType::ReportOnGeneratedMissingDataPoints,
            modified_attributes: None,
            child_ri: None,
            missing_data_count: Some(event.missing_count),
        };
        self.dispatch(&event.resource.ri, &event.resource, &input).await;
    }

    /// Evaluate every subscription hosted on `watched_ri` against `input`
    /// and notify the matching ones, decrementing `exc` and deleting
    /// exhausted subscriptions (reference: `checkSubscriptions` plus the
    /// `exc` handling in `_handleSubscriptionNotification`). For a `bn`
    /// subscription the decrement happens once per flushed aggregate
    /// envelope, not once per buffered signal — see
    /// [`crate::batch::BatchCoordinator::flush`].
    async fn dispatch(&self, watched_ri: &str, resource: &Resource, input: &MatchInput<'_>) {
        for sub in self.registry.for_parent(watched_ri) {
            if !matches(&sub, input) {
                continue;
            }
            self.notify_one(&sub, resource, input.reason).await;
        }
    }

    async fn notify_one(&self, sub: &SubscriptionConfig, resource: &Resource, reason: NotificationEventType) {
        let payload = build_signal(sub, resource, reason);

        if let Some(batch) = &sub.batch {
            let _ = self
                .batch
                .enqueue(&sub.ri, batch.duration_secs, batch.max_count, payload)
                .await;
            return;
        }

        for uri in &sub.notification_uris {
            let _ = self.sender.send(uri, &payload).await;
        }

        if let Some(remaining) = sub.expiration_counter {
            let remaining = remaining - 1;
            if remaining < 1 {
                let _ = self.unregister(&sub.ri).await;
            } else {
                self.registry.update(&sub.ri, |c| c.expiration_counter = Some(remaining));
            }
        }
    }
}

/// Build the `m2m:sgn` notification content per `nct` (reference:
/// `_handleSubscriptionNotification`'s content-type switch).
fn build_signal(sub: &SubscriptionConfig, resource: &Resource, reason: NotificationEventType) -> Value {
    let rep = match sub.content_type {
        NotificationContentType::All => resource.to_document(),
        NotificationContentType::Ri => json!({ "m2m:uri": resource.ri }),
        NotificationContentType::ModifiedAttributes => {
            json!({ (resource.ty.short_name()): resource.to_document() })
        }
        NotificationContentType::TriggerPayload => resource.to_document(),
        NotificationContentType::TimeSeriesNotification => json!({
            "m2m:tsn": {
                "mdc": resource.get_attr("mdc").cloned().unwrap_or(Value::Null),
                "mdlt": resource.get_attr("mdlt").cloned().unwrap_or(Value::Null),
            }
        }),
    };
    json!({
        "m2m:sgn": {
            "nev": { "net": reason as i32, "rep": rep },
            "sur": sub.ri,
        }
    })
}
