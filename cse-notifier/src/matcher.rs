//! Matching an event against a subscription's filter criteria (reference:
//! `NotificationManager.checkSubscriptions`), separated from delivery so
//! it can be unit-tested without a sender or event bus.

use crate::subscription::SubscriptionConfig;
use cse_model::{NotificationEventType, Resource, ResourceType};

/// The event being checked against subscriptions, mirroring the arguments
/// `checkSubscriptions` receives: the affected resource, the reason for
/// the check, and (for update/create-child reasons) extra context.
pub struct MatchInput<'a> {
    pub resource: &'a Resource,
    pub reason: NotificationEventType,
    /// For `ResourceUpdate`: attributes that changed.
    pub modified_attributes: Option<&'a [String]>,
    /// For `CreateDirectChild`/`DeleteDirectChild`: the child's own ri, so
    /// a subscription hosted directly on the child can be excluded from
    /// its own creation/deletion notification (reference: "for
    /// sub_ri == resource.ri: continue").
    pub child_ri: Option<&'a str>,
    /// For `ReportOnGeneratedMissingDataPoints`: how many points are missing.
    pub missing_data_count: Option<u64>,
}

/// Whether `sub` should be notified for `input`. Virtual resources never
/// carry subscriptions of their own (reference: the dispatcher resolves
/// virtual resources structurally, never persisting a `<sub>` under them),
/// so callers are expected to have already filtered those out upstream;
/// this function only applies the subscription's own filter criteria.
pub fn matches(sub: &SubscriptionConfig, input: &MatchInput) -> bool {
    if !sub.wants_event(input.reason) {
        return false;
    }

    if matches!(
        input.reason,
        NotificationEventType::CreateDirectChild | NotificationEventType::DeleteDirectChild
    ) {
        if let Some(child_ri) = input.child_ri {
            if child_ri == sub.ri {
                return false;
            }
        }
        if let Some(types) = &sub.child_types {
            if !types.contains(&input.resource.ty) {
                return false;
            }
        }
    }

    if input.reason == NotificationEventType::ResourceUpdate {
        if let (Some(filter), Some(modified)) = (&sub.attributes, input.modified_attributes) {
            if !filter.iter().any(|attr| modified.contains(attr)) {
                return false;
            }
        }
    }

    if input.reason == NotificationEventType::ReportOnGeneratedMissingDataPoints {
        let Some(count) = input.missing_data_count else {
            return false;
        };
        if count == 0 {
            return false;
        }
    }

    true
}

/// Whether `resource_type` may host the `<crs>`'s tracked resources as a
/// direct-child create/delete target — used by the group/CRS fan-out path
/// to decide when to re-run `matches` against group members (reference:
/// the membership-iteration loop inside `checkSubscriptions`).
pub fn is_direct_child_event(reason: NotificationEventType) -> bool {
    matches!(
        reason,
        NotificationEventType::CreateDirectChild | NotificationEventType::DeleteDirectChild
    )
}

pub fn skip_virtual(resource: &Resource) -> bool {
    resource.is_virtual()
}

pub fn resource_type_allowed(sub: &SubscriptionConfig, ty: ResourceType) -> bool {
    sub.child_types.as_ref().is_none_or(|types| types.contains(&ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::SubscriptionConfig;
    use cse_model::ResourceType;
    use serde_json::json;

    fn sub_config(net: Vec<i64>, atr: Option<Vec<&str>>) -> SubscriptionConfig {
        let mut r = Resource::new(ResourceType::Sub, "sub1".into(), Some("cnt1".into()), "sub".into(), "/cse-in/cnt1/sub".into());
        r.set_attr("nu", json!(["http://example.com"]));
        r.set_attr("nct", json!(1));
        let mut enc = serde_json::Map::new();
        enc.insert("net".into(), json!(net));
        if let Some(atr) = &atr {
            enc.insert("atr".into(), json!(atr));
        }
        r.set_attr("enc", serde_json::Value::Object(enc));
        SubscriptionConfig::from_resource(&r).unwrap()
    }

    fn cnt_resource() -> Resource {
        Resource::new(ResourceType::Cnt, "cnt1".into(), Some("cb".into()), "cnt".into(), "/cse-in/cnt".into())
    }

    #[test]
    fn rejects_reason_not_in_net() {
        let sub = sub_config(vec![2], None);
        let cnt = cnt_resource();
        let input = MatchInput {
            resource: &cnt,
            reason: NotificationEventType::ResourceUpdate,
            modified_attributes: None,
            child_ri: None,
            missing_data_count: None,
        };
        assert!(!matches(&sub, &input));
    }

    #[test]
    fn update_without_attribute_filter_always_matches() {
        let sub = sub_config(vec![1], None);
        let cnt = cnt_resource();
        let input = MatchInput {
            resource: &cnt,
            reason: NotificationEventType::ResourceUpdate,
            modified_attributes: Some(&["mni".to_string()]),
            child_ri: None,
            missing_data_count: None,
        };
        assert!(matches(&sub, &input));
    }

    #[test]
    fn update_with_attribute_filter_requires_intersection() {
        let sub = sub_config(vec![1], Some(vec!["lbl"]));
        let cnt = cnt_resource();
        let unrelated = MatchInput {
            resource: &cnt,
            reason: NotificationEventType::ResourceUpdate,
            modified_attributes: Some(&["mni".to_string()]),
            child_ri: None,
            missing_data_count: None,
        };
        assert!(!matches(&sub, &unrelated));

        let related = MatchInput {
            resource: &cnt,
            reason: NotificationEventType::ResourceUpdate,
            modified_attributes: Some(&["lbl".to_string()]),
            child_ri: None,
            missing_data_count: None,
        };
        assert!(matches(&sub, &related));
    }

    #[test]
    fn create_direct_child_skips_own_subscription() {
        let sub = sub_config(vec![3], None);
        let mut child = cnt_resource();
        child.ri = "sub1".to_string();
        let input = MatchInput {
            resource: &child,
            reason: NotificationEventType::CreateDirectChild,
            modified_attributes: None,
            child_ri: Some("sub1"),
            missing_data_count: None,
        };
        assert!(!matches(&sub, &input));
    }

    #[test]
    fn missing_data_requires_nonzero_count() {
        let sub = sub_config(vec![8], None);
        let ts = cnt_resource();
        let zero = MatchInput {
            resource: &ts,
            reason: NotificationEventType::ReportOnGeneratedMissingDataPoints,
            modified_attributes: None,
            child_ri: None,
            missing_data_count: Some(0),
        };
        assert!(!matches(&sub, &zero));

        let nonzero = MatchInput {
            resource: &ts,
            reason: NotificationEventType::ReportOnGeneratedMissingDataPoints,
            modified_attributes: None,
            child_ri: None,
            missing_data_count: Some(3),
        };
        assert!(matches(&sub, &nonzero));
    }
}
