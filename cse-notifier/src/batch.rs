//! `bn` batch-notification buffering and flush (reference:
//! `_storeBatchNotification`, `_startNewBatchNotificationWorker`,
//! `_sendSubscriptionAggregatedBatchNotification`). A subscription with a
//! `bn` policy never sends immediately; entries accumulate in the store's
//! batch buffer until either `bn.num` entries have queued or `bn.dur` has
//! elapsed since the first entry, whichever comes first.

use crate::registry::SubscriptionRegistry;
use crate::sender::NotificationSender;
use cse_core::error::CseResult;
use cse_scheduler::{ScheduleConfig, ScheduledTask, Scheduler};
use cse_storage::{BufferedNotification, Store};
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct BatchCoordinator {
    store: Arc<dyn Store>,
    sender: Arc<dyn NotificationSender>,
    registry: SubscriptionRegistry,
    scheduler: Scheduler,
    pending_counts: Arc<DashMap<String, usize>>,
    timer_running: Arc<DashMap<String, ()>>,
}

impl BatchCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        sender: Arc<dyn NotificationSender>,
        registry: SubscriptionRegistry,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            store,
            sender,
            registry,
            scheduler,
            pending_counts: Arc::new(DashMap::new()),
            timer_running: Arc::new(DashMap::new()),
        }
    }

    /// Queue a notification payload for `subscription_ri`, flushing
    /// immediately if `bn.num` is reached and otherwise arming a one-shot
    /// timer for `bn.dur` if one isn't already running for it.
    pub async fn enqueue(&self, subscription_ri: &str, duration_secs: f64, max_count: Option<u64>, payload: Value) -> CseResult<()> {
        self.store
            .enqueue_batch_notification(BufferedNotification {
                subscription_ri: subscription_ri.to_string(),
                payload,
                enqueued_at: Utc::now(),
            })
            .await?;

        let count = {
            let mut entry = self.pending_counts.entry(subscription_ri.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        if let Some(max) = max_count {
            if count >= max as usize {
                self.flush(subscription_ri).await?;
                return Ok(());
            }
        }

        if self.timer_running.insert(subscription_ri.to_string(), ()).is_none() {
            let coordinator = self.clone();
            let ri = subscription_ri.to_string();
            let delay = Duration::from_secs_f64(duration_secs.max(0.0));
            self.scheduler.spawn(ScheduledTask::new(
                format!("batch-flush-{ri}"),
                ScheduleConfig::Once(delay),
                move || {
                    let coordinator = coordinator.clone();
                    let ri = ri.clone();
                    async move {
                        if let Err(err) = coordinator.flush(&ri).await {
                            tracing::warn!(subscription_ri = %ri, error = %err, "batch notification flush failed");
                        }
                    }
                },
            ));
        }

        Ok(())
    }

    /// Drain and send the aggregated batch for `subscription_ri`
    /// (reference: `_sendSubscriptionAggregatedBatchNotification`). A `ln`
    /// subscription keeps only the newest buffered entry.
    ///
    /// `exc` (the expiration counter) decrements once here, for the
    /// envelope this flush actually sends, not once per buffered signal —
    /// a subscription with `bn.num=5` and `exc=3` must survive three
    /// flushes' worth of aggregated notifications, not three individual
    /// updates (SPEC_FULL.md §D.2).
    pub async fn flush(&self, subscription_ri: &str) -> CseResult<()> {
        self.timer_running.remove(subscription_ri);
        self.pending_counts.remove(subscription_ri);

        let mut notifications = self.store.drain_batch_notifications(subscription_ri).await?;
        if notifications.is_empty() {
            return Ok(());
        }
        notifications.sort_by_key(|n| n.enqueued_at);

        let Some(sub) = self.registry.get(subscription_ri) else {
            return Ok(());
        };

        let signals: Vec<Value> = if sub.latest_notify {
            notifications.into_iter().next_back().map(|n| n.payload).into_iter().collect()
        } else {
            notifications.into_iter().map(|n| n.payload).collect()
        };

        let envelope = json!({ "m2m:agn": { "m2m:sgn": signals } });
        for uri in &sub.notification_uris {
            self.sender.send(uri, &envelope).await?;
        }

        if let Some(remaining) = sub.expiration_counter {
            let remaining = remaining - 1;
            if remaining < 1 {
                self.registry.remove(subscription_ri);
                let deletion = json!({ "m2m:sgn": { "sud": true, "sur": subscription_ri } });
                for uri in &sub.notification_uris {
                    let _ = self.sender.send(uri, &deletion).await;
                }
            } else {
                self.registry.update(subscription_ri, |c| c.expiration_counter = Some(remaining));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::RecordingSender;
    use crate::subscription::SubscriptionConfig;
    use cse_model::{Resource, ResourceType};
    use cse_storage::InMemoryStore;
    use serde_json::json;

    fn make_coordinator() -> (BatchCoordinator, Arc<RecordingSender>, SubscriptionRegistry) {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let sender = Arc::new(RecordingSender::new());
        let registry = SubscriptionRegistry::new();
        let scheduler = Scheduler::new();
        let coordinator = BatchCoordinator::new(store, sender.clone(), registry.clone(), scheduler);
        (coordinator, sender, registry)
    }

    fn register_sub(registry: &SubscriptionRegistry, ri: &str, ln: bool) {
        let mut r = Resource::new(ResourceType::Sub, ri.into(), Some("cnt1".into()), "sub".into(), "/cse-in/cnt1/sub".into());
        r.set_attr("nu", json!(["http://example.com"]));
        r.set_attr("nct", json!(1));
        r.set_attr("ln", json!(ln));
        registry.insert(SubscriptionConfig::from_resource(&r).unwrap());
    }

    #[tokio::test]
    async fn flush_with_no_buffered_entries_sends_nothing() {
        let (coordinator, sender, registry) = make_coordinator();
        register_sub(&registry, "sub1", false);
        coordinator.flush("sub1").await.unwrap();
        assert!(sender.sent().await.is_empty());
    }

    #[tokio::test]
    async fn num_threshold_triggers_immediate_flush() {
        let (coordinator, sender, registry) = make_coordinator();
        register_sub(&registry, "sub1", false);

        coordinator.enqueue("sub1", 60.0, Some(2), json!({"n": 1})).await.unwrap();
        assert!(sender.sent().await.is_empty());
        coordinator.enqueue("sub1", 60.0, Some(2), json!({"n": 2})).await.unwrap();

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        let signals = sent[0].1["m2m:agn"]["m2m:sgn"].as_array().unwrap();
        assert_eq!(signals.len(), 2);
    }

    #[tokio::test]
    async fn exc_decrements_once_per_flush_not_per_buffered_entry() {
        let (coordinator, sender, registry) = make_coordinator();
        let mut r = Resource::new(ResourceType::Sub, "sub1".into(), Some("cnt1".into()), "sub".into(), "/cse-in/cnt1/sub".into());
        r.set_attr("nu", json!(["http://example.com"]));
        r.set_attr("nct", json!(1));
        r.set_attr("exc", json!(3));
        registry.insert(SubscriptionConfig::from_resource(&r).unwrap());

        coordinator.enqueue("sub1", 60.0, Some(5), json!({"n": 1})).await.unwrap();
        coordinator.enqueue("sub1", 60.0, Some(5), json!({"n": 2})).await.unwrap();
        coordinator.enqueue("sub1", 60.0, Some(5), json!({"n": 3})).await.unwrap();
        coordinator.enqueue("sub1", 60.0, Some(5), json!({"n": 4})).await.unwrap();
        coordinator.enqueue("sub1", 60.0, Some(5), json!({"n": 5})).await.unwrap();

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        let signals = sent[0].1["m2m:agn"]["m2m:sgn"].as_array().unwrap();
        assert_eq!(signals.len(), 5);
        assert_eq!(registry.get("sub1").unwrap().expiration_counter, Some(2));
    }

    #[tokio::test]
    async fn latest_notify_keeps_only_newest_entry() {
        let (coordinator, sender, registry) = make_coordinator();
        register_sub(&registry, "sub1", true);

        coordinator.enqueue("sub1", 60.0, Some(2), json!({"n": 1})).await.unwrap();
        coordinator.enqueue("sub1", 60.0, Some(2), json!({"n": 2})).await.unwrap();

        let sent = sender.sent().await;
        let signals = sent[0].1["m2m:agn"]["m2m:sgn"].as_array().unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0]["n"], 2);
    }
}
