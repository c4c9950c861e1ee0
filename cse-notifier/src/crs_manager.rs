//! Bridges real per-`rrat` `<SUB>` firings into cross-resource-subscription
//! window tracking (§4.3 "CRS windowing"). `crs.rs`'s own doc comment spells
//! out the division of labor: the dispatcher creates one `<sub>` per `rrat`
//! entry (using the matching `encs.enc` filter) with `acrs` pointing back at
//! this CRS, and a synthetic `nu` of [`synthetic_uri`]; `RoutingSender`
//! intercepts those before they hit the network and forwards the firing
//! here instead. The CRS's own `nu` notification goes out through the real
//! sender directly, so routed firings never loop back through themselves.

use crate::crs::{CrsConfig, WindowTracker};
use crate::sender::{DeliveryOutcome, NotificationSender};
use async_trait::async_trait;
use cse_core::error::CseResult;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::Arc;

pub const ROUTING_PREFIX: &str = "crs:";

/// The synthetic `nu` entry the dispatcher assigns to a per-`rrat` `<sub>`
/// so its notifications route back into [`CrsManager::on_regarded_fired`]
/// instead of leaving the process.
pub fn synthetic_uri(crs_ri: &str, regarded_ri: &str) -> String {
    format!("{ROUTING_PREFIX}{crs_ri}:{regarded_ri}")
}

fn parse_synthetic_uri(uri: &str) -> Option<(&str, &str)> {
    uri.strip_prefix(ROUTING_PREFIX)?.split_once(':')
}

/// Owns one [`WindowTracker`] per live `<CRS>` and fires its aggregated
/// notification once the tracker's window condition is satisfied.
pub struct CrsManager {
    trackers: DashMap<String, WindowTracker>,
    sender: Arc<dyn NotificationSender>,
}

impl CrsManager {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self {
            trackers: DashMap::new(),
            sender,
        }
    }

    pub fn register(&self, config: CrsConfig) {
        self.trackers.insert(config.ri.clone(), WindowTracker::new(config));
    }

    pub fn unregister(&self, crs_ri: &str) {
        self.trackers.remove(crs_ri);
    }

    pub fn is_registered(&self, crs_ri: &str) -> bool {
        self.trackers.contains_key(crs_ri)
    }

    /// Record that `regarded_ri`'s encapsulated condition fired for `crs_ri`,
    /// sending the CRS's own `nu` notification if the window condition is
    /// now satisfied.
    pub async fn on_regarded_fired(&self, crs_ri: &str, regarded_ri: &str) -> CseResult<()> {
        let should_fire = {
            let Some(mut tracker) = self.trackers.get_mut(crs_ri) else {
                return Ok(());
            };
            tracker.record_event(regarded_ri, cse_core::time::now())
        };
        if !should_fire {
            return Ok(());
        }
        let Some(tracker) = self.trackers.get(crs_ri) else {
            return Ok(());
        };
        let envelope = json!({ "m2m:sgn": { "sur": crs_ri } });
        for uri in &tracker.config().notification_uris {
            let _ = self.sender.send(uri, &envelope).await;
        }
        Ok(())
    }
}

/// Wraps a real [`NotificationSender`], intercepting synthetic CRS routing
/// URIs ([`synthetic_uri`]) before they reach the network and delegating
/// everything else straight to `inner`.
pub struct RoutingSender {
    inner: Arc<dyn NotificationSender>,
    crs_manager: Arc<CrsManager>,
}

impl RoutingSender {
    pub fn new(inner: Arc<dyn NotificationSender>, crs_manager: Arc<CrsManager>) -> Self {
        Self { inner, crs_manager }
    }
}

#[async_trait]
impl NotificationSender for RoutingSender {
    async fn send(&self, uri: &str, payload: &Value) -> CseResult<DeliveryOutcome> {
        if let Some((crs_ri, regarded_ri)) = parse_synthetic_uri(uri) {
            self.crs_manager.on_regarded_fired(crs_ri, regarded_ri).await?;
            return Ok(DeliveryOutcome::Delivered);
        }
        self.inner.send(uri, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{EventEvaluationMode, TimeWindowType};
    use crate::sender::RecordingSender;
    use chrono::Duration as ChronoDuration;

    fn config() -> CrsConfig {
        CrsConfig {
            ri: "crs1".to_string(),
            notification_uris: vec!["http://example.com/crs".to_string()],
            window_type: TimeWindowType::Sliding,
            window_size: ChronoDuration::seconds(2),
            regarded_resources: vec!["cnt1".to_string(), "cnt2".to_string()],
            evaluation_mode: EventEvaluationMode::AllEvents,
        }
    }

    #[tokio::test]
    async fn routing_sender_diverts_synthetic_uris() {
        let real = Arc::new(RecordingSender::new());
        let manager = Arc::new(CrsManager::new(real.clone()));
        manager.register(config());
        let routing = RoutingSender::new(real.clone(), manager.clone());

        let outcome = routing
            .send(&synthetic_uri("crs1", "cnt1"), &json!({}))
            .await
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert!(real.sent().await.is_empty());

        routing
            .send(&synthetic_uri("crs1", "cnt2"), &json!({}))
            .await
            .unwrap();
        let sent = real.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "http://example.com/crs");
    }

    #[tokio::test]
    async fn non_synthetic_uris_pass_through() {
        let real = Arc::new(RecordingSender::new());
        let manager = Arc::new(CrsManager::new(real.clone()));
        let routing = RoutingSender::new(real.clone(), manager);

        routing.send("http://example.com/direct", &json!({"a":1})).await.unwrap();
        let sent = real.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "http://example.com/direct");
    }
}
