//! In-memory index of active subscriptions, keyed by the parent resource
//! they watch (reference: `NotificationManager.getSubscriptionsByNetChty`,
//! which queries the storage layer directly; here that lookup is kept
//! local to the notifier per the design note preferring small explicit
//! lookup tables over growing `cse-storage::Store` into a god trait).

use crate::subscription::SubscriptionConfig;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    by_parent: Arc<DashMap<String, Vec<SubscriptionConfig>>>,
    by_ri: Arc<DashMap<String, String>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, config: SubscriptionConfig) {
        self.by_ri.insert(config.ri.clone(), config.parent_ri.clone());
        self.by_parent.entry(config.parent_ri.clone()).or_default().push(config);
    }

    /// Replace a previously registered subscription (reference:
    /// `updateSubscription`, which re-derives net/chty/atr after an update
    /// to an existing `<sub>`).
    pub fn replace(&self, config: SubscriptionConfig) {
        self.remove(&config.ri);
        self.insert(config);
    }

    pub fn remove(&self, ri: &str) -> Option<SubscriptionConfig> {
        let parent_ri = self.by_ri.remove(ri)?.1;
        let mut removed = None;
        if let Some(mut entry) = self.by_parent.get_mut(&parent_ri) {
            if let Some(pos) = entry.iter().position(|c| c.ri == ri) {
                removed = Some(entry.remove(pos));
            }
        }
        removed
    }

    pub fn for_parent(&self, parent_ri: &str) -> Vec<SubscriptionConfig> {
        self.by_parent.get(parent_ri).map(|e| e.clone()).unwrap_or_default()
    }

    pub fn get(&self, ri: &str) -> Option<SubscriptionConfig> {
        let parent_ri = self.by_ri.get(ri)?.clone();
        self.for_parent(&parent_ri).into_iter().find(|c| c.ri == ri)
    }

    /// Overwrite a single subscription's stored config in place (used to
    /// persist a decremented `exc` without a full remove/insert cycle).
    pub fn update<F>(&self, ri: &str, f: F)
    where
        F: FnOnce(&mut SubscriptionConfig),
    {
        let Some(parent_ri) = self.by_ri.get(ri).map(|e| e.clone()) else {
            return;
        };
        if let Some(mut entry) = self.by_parent.get_mut(&parent_ri) {
            if let Some(config) = entry.iter_mut().find(|c| c.ri == ri) {
                f(config);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cse_model::{Resource, ResourceType};
    use serde_json::json;

    fn config(ri: &str, parent_ri: &str) -> SubscriptionConfig {
        let mut r = Resource::new(ResourceType::Sub, ri.into(), Some(parent_ri.into()), "sub".into(), format!("/cse-in/{parent_ri}/sub"));
        r.set_attr("nu", json!(["http://example.com"]));
        r.set_attr("nct", json!(1));
        SubscriptionConfig::from_resource(&r).unwrap()
    }

    #[test]
    fn for_parent_returns_all_registered_subscriptions() {
        let registry = SubscriptionRegistry::new();
        registry.insert(config("sub1", "cnt1"));
        registry.insert(config("sub2", "cnt1"));
        registry.insert(config("sub3", "cnt2"));
        assert_eq!(registry.for_parent("cnt1").len(), 2);
        assert_eq!(registry.for_parent("cnt2").len(), 1);
    }

    #[test]
    fn remove_drops_from_both_indices() {
        let registry = SubscriptionRegistry::new();
        registry.insert(config("sub1", "cnt1"));
        assert!(registry.remove("sub1").is_some());
        assert!(registry.for_parent("cnt1").is_empty());
        assert!(registry.get("sub1").is_none());
    }

    #[test]
    fn update_mutates_in_place() {
        let registry = SubscriptionRegistry::new();
        registry.insert(config("sub1", "cnt1"));
        registry.update("sub1", |c| c.expiration_counter = Some(1));
        assert_eq!(registry.get("sub1").unwrap().expiration_counter, Some(1));
    }
}
